//! Backing cache shared by every broker of one tree.
//!
//! Two memoizing maps live here:
//!
//! - the resource map, keyed by the resource's own scope, the factory name and
//!   the key string;
//! - the auto-scope map, keyed by the *requesting* broker's scope, remembering
//!   which scope a factory picked so the choice is made once per requester.
//!
//! Both maps create values through [`flight::Slots`], which runs at most one
//! creation per key and never memoizes failures.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hearth_scope::{Scope, ScopeType};

use crate::resource::CachedResource;
use crate::{Broker, BrokerConfig, BrokerError, FactoryError, Resource, ResourceFactory, ResourceKey, Result, StoreError};

mod flight;
mod teardown;

use flight::Slots;
pub use teardown::CloseReport;

/// Composite key addressing one cache slot.
///
/// Equality and hashing are structural over all three parts. A `None` scope is
/// a distinct, valid value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey<S: ScopeType> {
	scope: Option<Scope<S>>,
	factory: Arc<str>,
	key: Arc<str>,
}

impl<S: ScopeType> CacheKey<S> {
	pub fn new(scope: Option<Scope<S>>, factory: impl Into<Arc<str>>, key: impl Into<Arc<str>>) -> Self {
		Self {
			scope,
			factory: factory.into(),
			key: key.into(),
		}
	}

	pub fn scope(&self) -> Option<&Scope<S>> {
		self.scope.as_ref()
	}

	pub fn factory(&self) -> &str {
		&self.factory
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub(crate) fn creation_failed(&self, err: FactoryError) -> BrokerError {
		BrokerError::Creation {
			factory: self.factory.to_string(),
			key: self.key.to_string(),
			source: Arc::new(err),
		}
	}

	pub(crate) fn aborted(&self) -> BrokerError {
		BrokerError::CreationAborted {
			factory: self.factory.to_string(),
			key: self.key.to_string(),
		}
	}

	pub(crate) fn recursive(&self) -> BrokerError {
		BrokerError::RecursiveCreation {
			factory: self.factory.to_string(),
			key: self.key.to_string(),
		}
	}

	fn type_mismatch(&self) -> BrokerError {
		BrokerError::TypeMismatch {
			factory: self.factory.to_string(),
			key: self.key.to_string(),
		}
	}

	fn already_bound(&self) -> BrokerError {
		BrokerError::AlreadyBound {
			factory: self.factory.to_string(),
			key: self.key.to_string(),
			scope: self.scope.as_ref().map(ToString::to_string).unwrap_or_default(),
		}
	}
}

impl<S: ScopeType> fmt::Display for CacheKey<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.scope {
			Some(scope) => write!(f, "{scope}/{}/{}", self.factory, self.key),
			None => write!(f, "-/{}/{}", self.factory, self.key),
		}
	}
}

/// Point-in-time counters for a [`BrokerCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
	/// Published resources.
	pub resources: usize,
	/// Resource creations currently running.
	pub pending: usize,
	/// Memoized auto-scope resolutions.
	pub auto_scopes: usize,
}

/// Memoizing resource cache with scoped teardown.
///
/// All operations take `&self`; share one instance per broker tree.
pub struct BrokerCache<S: ScopeType> {
	resources: Slots<S, CachedResource>,
	auto_scopes: Slots<S, Scope<S>>,
	shutdown_timeout: Duration,
	prune_auto_scopes: bool,
}

impl<S: ScopeType> BrokerCache<S> {
	/// Creates an empty cache using the teardown settings of `config`.
	pub fn new(config: &BrokerConfig) -> Self {
		Self {
			resources: Slots::new(),
			auto_scopes: Slots::new(),
			shutdown_timeout: config.shutdown_timeout(),
			prune_auto_scopes: config.prune_auto_scopes_on_close,
		}
	}

	/// Gets the resource for `key` at the scope picked by the factory.
	///
	/// The scope choice is memoized per requesting broker scope, factory and
	/// key, so brokers resolving to the same leaf scope share one resource.
	pub async fn get_auto_scoped<F>(&self, factory: &F, key: &F::Key, broker: &dyn Broker<S>) -> Result<Arc<F::Resource>>
	where
		F: ResourceFactory<S> + ?Sized,
	{
		let lookup = CacheKey::new(Some(broker.self_scope().clone()), factory.name(), key.to_configuration_key());
		let scope = self
			.auto_scopes
			.get_or_try_create(lookup.clone(), async {
				let config = broker.config_view(None, key, factory.name());
				let scope_type = factory.auto_scope(broker, key, &config).map_err(|err| lookup.creation_failed(err))?;
				let scope = broker.get_scope(scope_type)?;
				tracing::debug!(lookup = %lookup, resolved = %scope, "broker.cache.auto_scope");
				Ok(scope)
			})
			.await?;

		self.get_scoped(factory, key, &scope, broker).await
	}

	/// Gets the resource for `key` at `scope`, creating it on first use.
	///
	/// Concurrent callers for the same slot share a single factory call and
	/// all observe the same `Arc`. A failed creation is reported to every
	/// caller that joined it and leaves the slot empty for a later retry.
	pub async fn get_scoped<F>(&self, factory: &F, key: &F::Key, scope: &Scope<S>, broker: &dyn Broker<S>) -> Result<Arc<F::Resource>>
	where
		F: ResourceFactory<S> + ?Sized,
	{
		let cache_key = CacheKey::new(Some(scope.clone()), factory.name(), key.to_configuration_key());
		let cached = self
			.resources
			.get_or_try_create(cache_key.clone(), async {
				let config = broker.config_view(Some(scope.scope_type()), key, factory.name());
				tracing::debug!(key = %cache_key, "broker.cache.create");
				match factory.create_resource(broker, key, &config).await {
					Ok(resource) => Ok(resource.into_cached()),
					Err(err) => {
						tracing::debug!(key = %cache_key, error = %err, "broker.cache.create_failed");
						Err(cache_key.creation_failed(err))
					}
				}
			})
			.await?;

		cached.downcast::<F::Resource>().ok_or_else(|| cache_key.type_mismatch())
	}

	/// Publishes a prebuilt resource at `scope`.
	///
	/// Fails with [`BrokerError::AlreadyBound`] if the slot already holds a
	/// value; `resource` is dropped without shutdown in that case.
	pub fn bind<F>(&self, factory: &F, key: &F::Key, scope: &Scope<S>, resource: Resource<F::Resource>) -> Result<()>
	where
		F: ResourceFactory<S> + ?Sized,
	{
		let cache_key = CacheKey::new(Some(scope.clone()), factory.name(), key.to_configuration_key());
		if self.resources.insert_if_absent(cache_key.clone(), resource.into_cached())? {
			tracing::debug!(key = %cache_key, "broker.cache.bind");
			Ok(())
		} else {
			Err(cache_key.already_bound())
		}
	}

	/// Keys of all published resources.
	pub fn keys(&self) -> Result<Vec<CacheKey<S>>, StoreError> {
		self.resources.keys()
	}

	/// Returns current counters.
	pub fn stats(&self) -> Result<CacheStats, StoreError> {
		Ok(CacheStats {
			resources: self.resources.len()?,
			pending: self.resources.pending(),
			auto_scopes: self.auto_scopes.len()?,
		})
	}
}

impl<S: ScopeType> fmt::Debug for BrokerCache<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BrokerCache")
			.field("stats", &self.stats().ok())
			.field("shutdown_timeout", &self.shutdown_timeout)
			.field("prune_auto_scopes", &self.prune_auto_scopes)
			.finish()
	}
}
