use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{Result, ScopeError, ScopeInstance, ScopeType};

/// A node in the scope DAG.
///
/// Cheap to clone. Identity is the wrapped [`ScopeInstance`]; parent links are
/// only used for ancestry queries and do not take part in equality or hashing.
pub struct Scope<S: ScopeType> {
	inner: Arc<ScopeNode<S>>,
}

struct ScopeNode<S: ScopeType> {
	instance: ScopeInstance<S>,
	parents: Vec<Scope<S>>,
}

impl<S: ScopeType> Scope<S> {
	/// Creates a root node of the topology's root kind.
	pub fn root(id: impl Into<Arc<str>>) -> Self {
		Self {
			inner: Arc::new(ScopeNode {
				instance: ScopeInstance::new(S::root(), id),
				parents: Vec::new(),
			}),
		}
	}

	/// Creates a node below `parents`.
	///
	/// Every parent's kind must be listed in the child kind's
	/// [`ScopeType::parents`], and non-root kinds need at least one parent.
	pub fn child(instance: ScopeInstance<S>, parents: impl IntoIterator<Item = Scope<S>>) -> Result<Self> {
		let parents: Vec<_> = parents.into_iter().collect();
		let allowed = instance.scope_type().parents();

		if parents.is_empty() && !instance.scope_type().is_root() {
			return Err(ScopeError::MissingParent(instance.to_string()));
		}

		if let Some(parent) = parents.iter().find(|p| !allowed.contains(&p.scope_type())) {
			return Err(ScopeError::InvalidParent {
				child: instance.to_string(),
				parent: parent.to_string(),
				allowed: allowed.iter().map(|t| t.name()).collect::<Vec<_>>().join(", "),
			});
		}

		Ok(Self {
			inner: Arc::new(ScopeNode { instance, parents }),
		})
	}

	/// Returns the wrapped instance.
	pub fn instance(&self) -> &ScopeInstance<S> {
		&self.inner.instance
	}

	/// Returns the scope kind.
	pub fn scope_type(&self) -> S {
		self.inner.instance.scope_type()
	}

	/// Returns the instance identifier.
	pub fn id(&self) -> &str {
		self.inner.instance.id()
	}

	/// Returns the direct parents.
	pub fn parents(&self) -> &[Scope<S>] {
		&self.inner.parents
	}

	/// Finds the nearest node of `scope_type`, starting with this node.
	///
	/// The DAG is walked breadth-first so the closest match wins when several
	/// paths lead to nodes of the requested kind.
	pub fn find_ancestor(&self, scope_type: S) -> Option<Scope<S>> {
		let mut queue = VecDeque::from([self]);
		let mut seen = HashSet::new();
		while let Some(node) = queue.pop_front() {
			if !seen.insert(node.instance()) {
				continue;
			}
			if node.scope_type() == scope_type {
				return Some(node.clone());
			}
			queue.extend(node.parents());
		}
		None
	}

	/// Returns true if `other` is this node or lies somewhere above it.
	pub fn is_descendant_of(&self, other: &Scope<S>) -> bool {
		is_ancestor_or_self(self, other)
	}
}

/// Returns true if `root` equals `candidate` or is reachable from it through
/// parent links, i.e. `candidate` lies in the subtree rooted at `root`.
pub fn is_ancestor_or_self<S: ScopeType>(candidate: &Scope<S>, root: &Scope<S>) -> bool {
	let mut queue = VecDeque::from([candidate]);
	let mut seen = HashSet::new();
	while let Some(node) = queue.pop_front() {
		if node == root {
			return true;
		}
		if seen.insert(node.instance()) {
			queue.extend(node.parents());
		}
	}
	false
}

impl<S: ScopeType> Clone for Scope<S> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<S: ScopeType> PartialEq for Scope<S> {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner) || self.inner.instance == other.inner.instance
	}
}

impl<S: ScopeType> Eq for Scope<S> {}

impl<S: ScopeType> Hash for Scope<S> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.inner.instance.hash(state);
	}
}

impl<S: ScopeType> fmt::Debug for Scope<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("instance", &self.inner.instance)
			.field("parents", &self.inner.parents.iter().map(Scope::instance).collect::<Vec<_>>())
			.finish()
	}
}

impl<S: ScopeType> fmt::Display for Scope<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.inner.instance, f)
	}
}

#[cfg(test)]
mod tests;
