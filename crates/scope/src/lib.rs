//! Scope model for shared-resource brokers.
//!
//! A broker tree is organised as a DAG of [`Scope`] nodes. Every node carries a
//! [`ScopeInstance`] (a scope kind plus an identifier) and links to its parent
//! nodes. The kinds themselves are described by a [`ScopeType`] topology, which
//! declares for every kind which kinds may appear directly above it.
//!
//! Caches only need two things from this crate: structural equality of scopes
//! and the [`is_ancestor_or_self`] predicate used to select everything below a
//! scope that is being torn down.

mod error;
mod instance;
mod node;
mod topology;

pub use error::ScopeError;
pub use instance::ScopeInstance;
pub use node::{Scope, is_ancestor_or_self};
pub use topology::{JobScopeType, SimpleScopeType};

/// Result type for scope construction.
pub type Result<T, E = ScopeError> = std::result::Result<T, E>;

/// A kind of scope in a broker topology.
///
/// Implementations are small `Copy` enums. The topology is fixed at compile
/// time: [`ScopeType::parents`] lists the kinds that may sit directly above a
/// kind, and [`ScopeType::root`] names the single kind at the top.
pub trait ScopeType: Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static {
	/// Stable lowercase name, also used as a configuration segment.
	fn name(&self) -> &'static str;

	/// Kinds allowed as direct parents of this kind. Empty for the root.
	fn parents(&self) -> &'static [Self];

	/// The root kind of this topology.
	fn root() -> Self;

	/// Whether scopes of this kind live in a single process.
	fn is_local(&self) -> bool {
		false
	}

	/// Returns true if this is the root kind.
	fn is_root(&self) -> bool {
		*self == Self::root()
	}
}
