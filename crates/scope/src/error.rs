//! Error types for scope construction.

use thiserror::Error;

/// Errors raised while building scope nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
	/// A parent's kind is not declared as a parent kind of the child.
	#[error("scope {child} cannot be placed under {parent} (allowed parent kinds: {allowed})")]
	InvalidParent {
		/// The scope being built.
		child: String,
		/// The rejected parent scope.
		parent: String,
		/// Comma separated list of allowed parent kinds.
		allowed: String,
	},

	/// A non-root scope was built without any parent.
	#[error("scope {0} is not a root kind and needs at least one parent")]
	MissingParent(String),
}
