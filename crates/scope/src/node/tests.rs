use std::collections::HashSet;

use rstest::{fixture, rstest};

use super::*;
use crate::{JobScopeType, SimpleScopeType};

/// Scopes of one job running in one container:
/// global > instance > {job, container} > attempt > task.
struct JobTree {
	global: Scope<JobScopeType>,
	instance: Scope<JobScopeType>,
	job: Scope<JobScopeType>,
	container: Scope<JobScopeType>,
	attempt: Scope<JobScopeType>,
	task: Scope<JobScopeType>,
	other_job: Scope<JobScopeType>,
}

impl JobTree {
	fn get(&self, name: &str) -> &Scope<JobScopeType> {
		match name {
			"global" => &self.global,
			"instance" => &self.instance,
			"job" => &self.job,
			"container" => &self.container,
			"attempt" => &self.attempt,
			"task" => &self.task,
			"other_job" => &self.other_job,
			other => panic!("unknown scope {other}"),
		}
	}
}

fn node(scope_type: JobScopeType, id: &str, parents: &[&Scope<JobScopeType>]) -> Scope<JobScopeType> {
	Scope::child(ScopeInstance::new(scope_type, id), parents.iter().map(|p| (*p).clone())).unwrap()
}

#[fixture]
fn tree() -> JobTree {
	let global = Scope::root("cluster");
	let instance = node(JobScopeType::Instance, "host-1", &[&global]);
	let job = node(JobScopeType::Job, "ingest", &[&instance]);
	let container = node(JobScopeType::Container, "c-7", &[&instance]);
	let attempt = node(JobScopeType::MultiTaskAttempt, "a-1", &[&job, &container]);
	let task = node(JobScopeType::Task, "t-1", &[&attempt]);
	let other_job = node(JobScopeType::Job, "export", &[&instance]);
	JobTree {
		global,
		instance,
		job,
		container,
		attempt,
		task,
		other_job,
	}
}

#[rstest]
#[case::self_is_included("job", "job", true)]
#[case::direct_child("attempt", "job", true)]
#[case::through_second_parent("task", "container", true)]
#[case::everything_below_root("task", "global", true)]
#[case::ancestor_is_not_below("instance", "job", false)]
#[case::sibling_job("other_job", "job", false)]
#[case::sibling_branch("job", "container", false)]
fn ancestor_predicate(tree: JobTree, #[case] candidate: &str, #[case] root: &str, #[case] expected: bool) {
	assert_eq!(is_ancestor_or_self(tree.get(candidate), tree.get(root)), expected);
	assert_eq!(tree.get(candidate).is_descendant_of(tree.get(root)), expected);
}

#[rstest]
fn find_ancestor_walks_all_parents(tree: JobTree) {
	assert_eq!(tree.task.find_ancestor(JobScopeType::Container), Some(tree.container.clone()));
	assert_eq!(tree.task.find_ancestor(JobScopeType::Job), Some(tree.job.clone()));
	assert_eq!(tree.task.find_ancestor(JobScopeType::Task), Some(tree.task.clone()));
	assert_eq!(tree.job.find_ancestor(JobScopeType::Task), None);
}

#[test]
fn equality_is_structural() {
	let a: Scope<SimpleScopeType> = Scope::root("proc");
	let b: Scope<SimpleScopeType> = Scope::root("proc");
	assert_eq!(a, b);

	let local_a = Scope::child(ScopeInstance::new(SimpleScopeType::Local, "worker"), [a]).unwrap();
	let local_b = Scope::child(ScopeInstance::new(SimpleScopeType::Local, "worker"), [b]).unwrap();
	assert_eq!(local_a, local_b);

	let set: HashSet<_> = [local_a, local_b].into_iter().collect();
	assert_eq!(set.len(), 1);
}

#[test]
fn child_rejects_undeclared_parent_kind() {
	let global: Scope<JobScopeType> = Scope::root("cluster");
	let err = Scope::child(ScopeInstance::new(JobScopeType::Task, "t-1"), [global]).unwrap_err();
	assert_eq!(
		err,
		ScopeError::InvalidParent {
			child: "task:t-1".into(),
			parent: "global:cluster".into(),
			allowed: "multi_task_attempt".into(),
		}
	);
}

#[test]
fn child_requires_a_parent() {
	let err = Scope::<SimpleScopeType>::child(ScopeInstance::new(SimpleScopeType::Local, "orphan"), []).unwrap_err();
	assert_eq!(err, ScopeError::MissingParent("local:orphan".into()));
}

#[test]
fn local_kinds() {
	assert!(!JobScopeType::Job.is_local());
	assert!(JobScopeType::Task.is_local());
	assert!(SimpleScopeType::Local.is_local());
	assert!(JobScopeType::Global.is_root());
}
