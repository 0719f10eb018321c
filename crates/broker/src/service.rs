//! A [`Service`] backed by a spawned tokio task.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{CloseError, Service};

type Outcome = Option<Result<(), String>>;

/// Background task exposed as a stoppable service.
///
/// The task receives a [`CancellationToken`] that fires on
/// [`Service::stop_async`] or when the handle is dropped, and reports its exit
/// through a `watch` channel. A task that panics is reported as failed.
pub struct TaskService {
	name: String,
	cancel: CancellationToken,
	outcome: watch::Receiver<Outcome>,
}

impl TaskService {
	/// Spawns `run` on the current tokio runtime.
	///
	/// # Panics
	///
	/// Panics when called outside a tokio runtime.
	pub fn spawn<F, Fut>(name: impl Into<String>, run: F) -> Self
	where
		F: FnOnce(CancellationToken) -> Fut,
		Fut: Future<Output = Result<(), String>> + Send + 'static,
	{
		let name = name.into();
		let cancel = CancellationToken::new();
		let (tx, outcome) = watch::channel(None);
		let task = run(cancel.child_token());

		let task_name = name.clone();
		tokio::spawn(async move {
			let result = task.await;
			tracing::debug!(service = %task_name, ok = result.is_ok(), "broker.service.exit");
			tx.send_replace(Some(result));
		});

		Self { name, cancel, outcome }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns true once a stop was requested.
	pub fn is_stopping(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Returns true once the task has reported its exit.
	pub fn is_terminated(&self) -> bool {
		self.outcome.borrow().is_some()
	}
}

#[async_trait]
impl Service for TaskService {
	fn stop_async(&self) {
		tracing::debug!(service = %self.name, "broker.service.stop");
		self.cancel.cancel();
	}

	async fn await_terminated(&self) -> Result<(), CloseError> {
		let mut rx = self.outcome.clone();
		loop {
			let outcome = rx.borrow_and_update().clone();
			match outcome {
				Some(Ok(())) => return Ok(()),
				Some(Err(reason)) => return Err(CloseError::ServiceFailed(reason)),
				None => {}
			}
			if rx.changed().await.is_err() {
				return Err(CloseError::ServiceFailed(format!("service {} exited without reporting", self.name)));
			}
		}
	}
}

impl Drop for TaskService {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

impl fmt::Debug for TaskService {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TaskService")
			.field("name", &self.name)
			.field("stopping", &self.is_stopping())
			.field("terminated", &self.is_terminated())
			.finish()
	}
}
