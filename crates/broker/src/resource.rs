//! Created resources and their shutdown capabilities.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::CloseError;

/// A resource that is closed synchronously when its scope is torn down.
pub trait Closeable: Send + Sync {
	fn close(&self) -> Result<(), CloseError>;
}

/// A long-running service stopped asynchronously when its scope is torn down.
///
/// Teardown calls [`Service::stop_async`] on every service first and only then
/// waits for each one, so `stop_async` must not block.
#[async_trait]
pub trait Service: Send + Sync {
	/// Requests the service to stop. Must return promptly.
	fn stop_async(&self);

	/// Resolves once the service has terminated.
	///
	/// The cache bounds this wait with its shutdown timeout.
	async fn await_terminated(&self) -> Result<(), CloseError>;
}

/// Shutdown capability declared for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
	/// Dropped on teardown.
	Inert,
	/// Closed synchronously on teardown.
	Closeable,
	/// Stopped and awaited on teardown.
	Service,
}

#[derive(Clone)]
pub(crate) enum Lifecycle {
	Inert,
	Closeable(Arc<dyn Closeable>),
	Service(Arc<dyn Service>),
}

impl Lifecycle {
	fn capability(&self) -> Capability {
		match self {
			Self::Inert => Capability::Inert,
			Self::Closeable(_) => Capability::Closeable,
			Self::Service(_) => Capability::Service,
		}
	}
}

/// A value produced by a factory, tagged with its shutdown capability.
///
/// The capability is fixed when the factory wraps the value; the cache never
/// inspects the value's type at teardown.
pub struct Resource<T> {
	value: Arc<T>,
	lifecycle: Lifecycle,
}

impl<T: Send + Sync + 'static> Resource<T> {
	/// A value needing no shutdown.
	pub fn inert(value: T) -> Self {
		Self {
			value: Arc::new(value),
			lifecycle: Lifecycle::Inert,
		}
	}

	/// A value closed through [`Closeable::close`] on teardown.
	pub fn closeable(value: T) -> Self
	where
		T: Closeable,
	{
		let value = Arc::new(value);
		let closer: Arc<dyn Closeable> = value.clone();
		Self {
			value,
			lifecycle: Lifecycle::Closeable(closer),
		}
	}

	/// A value stopped through [`Service`] on teardown.
	pub fn service(value: T) -> Self
	where
		T: Service,
	{
		let value = Arc::new(value);
		let service: Arc<dyn Service> = value.clone();
		Self {
			value,
			lifecycle: Lifecycle::Service(service),
		}
	}

	/// The shared value.
	pub fn value(&self) -> &Arc<T> {
		&self.value
	}

	/// The declared shutdown capability.
	pub fn capability(&self) -> Capability {
		self.lifecycle.capability()
	}

	pub(crate) fn into_cached(self) -> CachedResource {
		CachedResource {
			value: self.value,
			lifecycle: self.lifecycle,
		}
	}
}

/// Type-erased cache entry.
#[derive(Clone)]
pub(crate) struct CachedResource {
	pub(crate) value: Arc<dyn Any + Send + Sync>,
	pub(crate) lifecycle: Lifecycle,
}

impl CachedResource {
	pub(crate) fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		Arc::clone(&self.value).downcast::<T>().ok()
	}
}

#[cfg(test)]
mod tests;
