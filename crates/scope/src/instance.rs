use std::fmt;
use std::sync::Arc;

use crate::ScopeType;

/// A concrete scope: a kind plus an identifier unique within that kind.
///
/// Equality and hashing are structural, so two instances built independently
/// from the same kind and id address the same cache slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeInstance<S> {
	scope_type: S,
	id: Arc<str>,
}

impl<S: ScopeType> ScopeInstance<S> {
	/// Creates an instance of `scope_type` identified by `id`.
	pub fn new(scope_type: S, id: impl Into<Arc<str>>) -> Self {
		Self { scope_type, id: id.into() }
	}

	/// Returns the scope kind.
	pub fn scope_type(&self) -> S {
		self.scope_type
	}

	/// Returns the identifier.
	pub fn id(&self) -> &str {
		&self.id
	}
}

impl<S: ScopeType> fmt::Display for ScopeInstance<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.scope_type.name(), self.id)
	}
}
