//! Scope-aware brokers over a shared [`BrokerCache`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_scope::{Scope, ScopeInstance, ScopeType};

use crate::{BrokerCache, BrokerConfig, BrokerError, CacheStats, CloseReport, ConfigView, Resource, ResourceFactory, ResourceKey, Result, StoreError};

/// The view of a broker handed to factories.
pub trait Broker<S: ScopeType>: Send + Sync {
	/// Scope this broker is attached to.
	fn self_scope(&self) -> &Scope<S>;

	/// Resolves the nearest scope of `scope_type` at or above this broker.
	fn get_scope(&self, scope_type: S) -> Result<Scope<S>>;

	/// Resolves configuration for `factory_name` and `key` at `scope_type`.
	fn config_view(&self, scope_type: Option<S>, key: &dyn ResourceKey, factory_name: &str) -> ConfigView;
}

struct BrokerTree<S: ScopeType> {
	root: Scope<S>,
	config: BrokerConfig,
	cache: BrokerCache<S>,
	closed: AtomicBool,
}

/// A broker attached to one scope of a broker tree.
///
/// Brokers are cheap to clone; every broker derived from the same root shares
/// one cache, so a resource fetched at a scope is the same instance no matter
/// which broker below that scope asked for it.
pub struct SharedResourcesBroker<S: ScopeType> {
	scope: Scope<S>,
	tree: Arc<BrokerTree<S>>,
}

impl<S: ScopeType> SharedResourcesBroker<S> {
	/// Creates the root broker of a new tree.
	pub fn new(config: BrokerConfig, root: Scope<S>) -> Self {
		let cache = BrokerCache::new(&config);
		tracing::debug!(scope = %root, "broker.tree.create");
		Self {
			scope: root.clone(),
			tree: Arc::new(BrokerTree {
				root,
				config,
				cache,
				closed: AtomicBool::new(false),
			}),
		}
	}

	/// Creates a root broker for a topology root named `id` with default settings.
	pub fn with_root_id(id: impl Into<Arc<str>>) -> Self {
		Self::new(BrokerConfig::default(), Scope::root(id))
	}

	/// Creates a sub-broker for `instance` directly below this broker's scope.
	pub fn child(&self, instance: ScopeInstance<S>) -> Result<Self> {
		self.child_with_parents(instance, [])
	}

	/// Creates a sub-broker below this broker's scope and `extra_parents`.
	///
	/// Use this for kinds with several parents, e.g. a task attempt sitting
	/// below both its job and its container.
	pub fn child_with_parents(&self, instance: ScopeInstance<S>, extra_parents: impl IntoIterator<Item = Scope<S>>) -> Result<Self> {
		self.ensure_open()?;
		let parents = std::iter::once(self.scope.clone()).chain(extra_parents);
		let scope = Scope::child(instance, parents)?;
		Ok(Self {
			scope,
			tree: Arc::clone(&self.tree),
		})
	}

	/// Gets a resource at the scope chosen by the factory.
	pub async fn get_shared_resource<F>(&self, factory: &F, key: &F::Key) -> Result<Arc<F::Resource>>
	where
		F: ResourceFactory<S> + ?Sized,
	{
		self.ensure_open()?;
		let resource = self.tree.cache.get_auto_scoped(factory, key, self).await?;
		self.reject_if_closed(resource).await
	}

	/// Gets a resource at the nearest scope of `scope_type`.
	pub async fn get_shared_resource_at_scope<F>(&self, factory: &F, key: &F::Key, scope_type: S) -> Result<Arc<F::Resource>>
	where
		F: ResourceFactory<S> + ?Sized,
	{
		self.ensure_open()?;
		let scope = self.get_scope(scope_type)?;
		let resource = self.tree.cache.get_scoped(factory, key, &scope, self).await?;
		self.reject_if_closed(resource).await
	}

	/// Publishes a prebuilt resource at the nearest scope of `scope_type`.
	pub fn bind_shared_resource_at_scope<F>(&self, factory: &F, key: &F::Key, scope_type: S, resource: Resource<F::Resource>) -> Result<()>
	where
		F: ResourceFactory<S> + ?Sized,
	{
		self.ensure_open()?;
		let scope = self.get_scope(scope_type)?;
		self.tree.cache.bind(factory, key, &scope, resource)
	}

	/// Tears down every resource cached at this broker's scope or below.
	///
	/// Closing the root broker tears down the whole tree and rejects further
	/// requests from every broker of the tree. Closing a sub-broker only
	/// invalidates its subtree; later requests recreate what they need.
	pub async fn close(&self) -> Result<CloseReport> {
		if self.is_root() {
			if self.tree.closed.swap(true, Ordering::AcqRel) {
				tracing::debug!(scope = %self.scope, "broker.tree.already_closed");
			}
			Ok(self.tree.cache.close(None).await?)
		} else {
			Ok(self.tree.cache.close(Some(&self.scope)).await?)
		}
	}

	/// Returns true if this broker sits at the root of its tree.
	pub fn is_root(&self) -> bool {
		self.scope == self.tree.root
	}

	/// Returns true once the root broker has been closed.
	pub fn is_closed(&self) -> bool {
		self.tree.closed.load(Ordering::Acquire)
	}

	/// Settings shared by the tree.
	pub fn config(&self) -> &BrokerConfig {
		&self.tree.config
	}

	/// The tree's backing cache.
	pub fn cache(&self) -> &BrokerCache<S> {
		&self.tree.cache
	}

	/// Counters of the tree's cache.
	pub fn cache_stats(&self) -> Result<CacheStats, StoreError> {
		self.tree.cache.stats()
	}

	fn ensure_open(&self) -> Result<()> {
		if self.is_closed() {
			return Err(self.closed_error());
		}
		Ok(())
	}

	/// Fails a get that finished after the root was closed.
	///
	/// A creation already running when the root closed publishes after the
	/// close snapshot; tear down whatever is still cached so nothing outlives
	/// the tree.
	async fn reject_if_closed<T>(&self, resource: T) -> Result<T> {
		if !self.is_closed() {
			return Ok(resource);
		}
		let report = self.tree.cache.close(None).await?;
		tracing::debug!(scope = %self.scope, invalidated = report.invalidated(), "broker.tree.late_resource");
		Err(self.closed_error())
	}

	fn closed_error(&self) -> BrokerError {
		BrokerError::Closed(self.tree.root.to_string())
	}
}

impl<S: ScopeType> Broker<S> for SharedResourcesBroker<S> {
	fn self_scope(&self) -> &Scope<S> {
		&self.scope
	}

	fn get_scope(&self, scope_type: S) -> Result<Scope<S>> {
		self.scope.find_ancestor(scope_type).ok_or_else(|| BrokerError::NoSuchScope {
			scope_type: scope_type.name(),
			scope: self.scope.to_string(),
		})
	}

	fn config_view(&self, scope_type: Option<S>, key: &dyn ResourceKey, factory_name: &str) -> ConfigView {
		self.tree.config.view(factory_name, scope_type.map(|s| s.name()), &key.to_configuration_key())
	}
}

impl<S: ScopeType> Clone for SharedResourcesBroker<S> {
	fn clone(&self) -> Self {
		Self {
			scope: self.scope.clone(),
			tree: Arc::clone(&self.tree),
		}
	}
}

impl<S: ScopeType> fmt::Debug for SharedResourcesBroker<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SharedResourcesBroker")
			.field("scope", &self.scope)
			.field("root", &self.tree.root)
			.field("closed", &self.is_closed())
			.finish()
	}
}
