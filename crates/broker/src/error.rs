//! Error types for resource creation and teardown.

use std::sync::Arc;
use std::time::Duration;

use hearth_scope::ScopeError;
use thiserror::Error;

/// Failure reported by a [`ResourceFactory`](crate::ResourceFactory).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FactoryError {
	message: String,
	#[source]
	source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FactoryError {
	/// Creates an error with a message only.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			source: None,
		}
	}

	/// Creates an error wrapping an underlying cause.
	pub fn with_source(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self {
			message: message.into(),
			source: Some(Box::new(source)),
		}
	}

	/// Returns the message.
	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Failure while shutting down one resource during a scoped close.
///
/// Never returned from [`BrokerCache::close`](crate::BrokerCache::close);
/// these are logged and counted in the [`CloseReport`](crate::CloseReport).
#[derive(Debug, Error)]
pub enum CloseError {
	/// The resource's own close routine failed.
	#[error("close failed: {0}")]
	Failed(String),

	/// I/O error raised while closing.
	#[error("I/O error while closing: {0}")]
	Io(#[from] std::io::Error),

	/// A stopped service did not terminate in time.
	#[error("service did not terminate within {0:?}")]
	Timeout(Duration),

	/// A stopped service terminated with a failure.
	#[error("service failed: {0}")]
	ServiceFailed(String),
}

/// The cache storage itself is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// A thread panicked while holding the store lock.
	#[error("resource store lock poisoned")]
	Poisoned,
}

/// Errors surfaced to callers of the broker and cache.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BrokerError {
	/// The factory failed to create the resource or to pick its scope.
	#[error("factory {factory} failed for key {key:?}: {source}")]
	Creation {
		factory: String,
		key: String,
		source: Arc<FactoryError>,
	},

	/// The creating call was cancelled before it published a result.
	#[error("creation of key {key:?} by factory {factory} was aborted")]
	CreationAborted { factory: String, key: String },

	/// A creation asked for the very slot it is creating.
	#[error("factory {factory} requested key {key:?} while creating it")]
	RecursiveCreation { factory: String, key: String },

	/// No scope of the requested kind sits at or above the broker's scope.
	#[error("no {scope_type} scope at or above {scope}")]
	NoSuchScope { scope_type: &'static str, scope: String },

	/// The cached value has a different type than the factory produces.
	#[error("cached value for key {key:?} of factory {factory} has an unexpected type")]
	TypeMismatch { factory: String, key: String },

	/// A value is already cached for the slot being bound.
	#[error("key {key:?} of factory {factory} is already bound at {scope}")]
	AlreadyBound { factory: String, key: String, scope: String },

	/// The broker tree has been shut down.
	#[error("broker tree rooted at {0} has been closed")]
	Closed(String),

	/// A sub-scope could not be built.
	#[error(transparent)]
	Scope(#[from] ScopeError),

	/// The cache storage is unusable.
	#[error(transparent)]
	Store(#[from] StoreError),
}
