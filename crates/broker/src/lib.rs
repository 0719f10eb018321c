//! Scope-aware shared-resource broker.
//!
//! Expensive resources (connection pools, clients, background services) are
//! created lazily by a [`ResourceFactory`] and shared by every consumer asking
//! for the same `(scope, factory, key)` triple. The [`BrokerCache`] guarantees
//! at most one concurrent creation per triple and tears down a whole scope
//! subtree on [`BrokerCache::close`], stopping services and closing closeable
//! resources on a best-effort basis.
//!
//! [`SharedResourcesBroker`] is the consumer-facing view: one broker per scope,
//! all brokers of a tree sharing one cache.
//!
//! ```ignore
//! let root = SharedResourcesBroker::new(BrokerConfig::default(), Scope::root("cluster"));
//! let job = root.child(ScopeInstance::new(JobScopeType::Instance, "host-1"))?
//! 	.child(ScopeInstance::new(JobScopeType::Job, "ingest"))?;
//!
//! // Scope chosen by the factory.
//! let pool = job.get_shared_resource(&PoolFactory, &NamedKey::new("orders")).await?;
//!
//! // Tears down everything created at the job scope or below.
//! let report = job.close().await?;
//! ```

mod broker;
pub mod cache;
mod config;
mod error;
mod factory;
mod key;
mod resource;
mod service;

pub use broker::{Broker, SharedResourcesBroker};
pub use cache::{BrokerCache, CacheKey, CacheStats, CloseReport};
pub use config::{BrokerConfig, ConfigError, ConfigView};
pub use error::{BrokerError, CloseError, FactoryError, StoreError};
pub use factory::ResourceFactory;
pub use hearth_scope::{Scope, ScopeInstance, ScopeType};
pub use key::{EmptyKey, NamedKey, ResourceKey};
pub use resource::{Capability, Closeable, Resource, Service};
pub use service::TaskService;

/// Result type for broker operations.
pub type Result<T, E = BrokerError> = std::result::Result<T, E>;
