//! Stock scope topologies.

use crate::ScopeType;

/// Two-level topology: one process-wide scope with local scopes below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleScopeType {
	Global,
	Local,
}

impl ScopeType for SimpleScopeType {
	fn name(&self) -> &'static str {
		match self {
			Self::Global => "global",
			Self::Local => "local",
		}
	}

	fn parents(&self) -> &'static [Self] {
		match self {
			Self::Global => &[],
			Self::Local => &[Self::Global],
		}
	}

	fn root() -> Self {
		Self::Global
	}

	fn is_local(&self) -> bool {
		matches!(self, Self::Local)
	}
}

/// Topology for batch jobs running on a cluster of containers.
///
/// ```text
/// Global
///   └─ Instance
///        ├─ Job ─────────┐
///        └─ Container ───┴─ MultiTaskAttempt ── Task
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobScopeType {
	Global,
	Instance,
	Job,
	Container,
	MultiTaskAttempt,
	Task,
}

impl ScopeType for JobScopeType {
	fn name(&self) -> &'static str {
		match self {
			Self::Global => "global",
			Self::Instance => "instance",
			Self::Job => "job",
			Self::Container => "container",
			Self::MultiTaskAttempt => "multi_task_attempt",
			Self::Task => "task",
		}
	}

	fn parents(&self) -> &'static [Self] {
		match self {
			Self::Global => &[],
			Self::Instance => &[Self::Global],
			Self::Job | Self::Container => &[Self::Instance],
			Self::MultiTaskAttempt => &[Self::Job, Self::Container],
			Self::Task => &[Self::MultiTaskAttempt],
		}
	}

	fn root() -> Self {
		Self::Global
	}

	fn is_local(&self) -> bool {
		matches!(self, Self::Container | Self::MultiTaskAttempt | Self::Task)
	}
}
