use async_trait::async_trait;
use hearth_scope::ScopeType;

use crate::{Broker, ConfigView, FactoryError, Resource, ResourceKey};

/// Produces shared resources on behalf of a broker.
///
/// A factory is identified by [`ResourceFactory::name`]; two factories with the
/// same name share cache slots and configuration.
#[async_trait]
pub trait ResourceFactory<S: ScopeType>: Send + Sync {
	/// The shared value type.
	type Resource: Send + Sync + 'static;
	/// The key type selecting one resource.
	type Key: ResourceKey;

	/// Stable factory name.
	fn name(&self) -> &str;

	/// Creates the resource for `key`.
	///
	/// `config` is resolved for the scope kind the resource is cached at.
	async fn create_resource(&self, broker: &dyn Broker<S>, key: &Self::Key, config: &ConfigView) -> Result<Resource<Self::Resource>, FactoryError>;

	/// Picks the scope kind a resource lives at when the caller did not name one.
	///
	/// `config` is resolved without a scope kind. Defaults to the topology root,
	/// sharing one instance across the whole broker tree.
	fn auto_scope(&self, _broker: &dyn Broker<S>, _key: &Self::Key, _config: &ConfigView) -> Result<S, FactoryError> {
		Ok(S::root())
	}
}
