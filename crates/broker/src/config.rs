//! Broker configuration and per-resource configuration views.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::{Table, Value};

use crate::FactoryError;

/// Errors raised while loading a [`BrokerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Configuration shared by every broker of one tree.
///
/// ```toml
/// shutdown_timeout_ms = 10000
/// prune_auto_scopes_on_close = false
///
/// [resources.pool]
/// max_connections = 8
///
/// [resources.pool.job]
/// max_connections = 2
///
/// [resources.pool.orders]
/// url = "postgres://orders"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
	/// Per-service wait for termination during scoped teardown, in milliseconds.
	#[serde(default = "default_shutdown_timeout")]
	pub shutdown_timeout_ms: u64,
	/// Also forget memoized auto scopes inside a closed subtree.
	#[serde(default)]
	pub prune_auto_scopes_on_close: bool,
	/// Per-factory settings, see [`ConfigView`].
	#[serde(default)]
	pub resources: Table,
}

/// Returns the default per-service shutdown wait in milliseconds.
fn default_shutdown_timeout() -> u64 {
	10_000
}

impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			shutdown_timeout_ms: default_shutdown_timeout(),
			prune_auto_scopes_on_close: false,
			resources: Table::new(),
		}
	}
}

impl BrokerConfig {
	/// Parses a configuration document.
	pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	/// Sets the per-service shutdown wait.
	///
	/// Kept at millisecond resolution; anything finer is rounded up so a
	/// non-zero wait never becomes zero.
	#[must_use]
	pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
		let mut millis = timeout.as_millis();
		if timeout.subsec_nanos() % 1_000_000 != 0 {
			millis += 1;
		}
		self.shutdown_timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
		self
	}

	/// Enables or disables auto-scope pruning on close.
	#[must_use]
	pub fn with_auto_scope_pruning(mut self, enabled: bool) -> Self {
		self.prune_auto_scopes_on_close = enabled;
		self
	}

	/// Replaces the settings table of one factory.
	#[must_use]
	pub fn with_resource(mut self, factory: impl Into<String>, settings: Table) -> Self {
		self.resources.insert(factory.into(), Value::Table(settings));
		self
	}

	/// Per-service shutdown wait.
	pub fn shutdown_timeout(&self) -> Duration {
		Duration::from_millis(self.shutdown_timeout_ms)
	}

	/// Resolves the view handed to `factory` for `key` at `scope_type`.
	pub fn view(&self, factory: &str, scope_type: Option<&'static str>, key: &str) -> ConfigView {
		ConfigView::resolve(&self.resources, factory, scope_type, key)
	}
}

/// Flattened settings for one `(factory, scope kind, key)` combination.
///
/// Layers are merged from least to most specific, later layers overriding
/// earlier ones:
///
/// 1. `resources.<factory>`
/// 2. `resources.<factory>.<scope>` (only with a scope kind)
/// 3. `resources.<factory>.<key>` (only with a non-empty key)
/// 4. `resources.<factory>.<scope>.<key>` (only with both)
///
/// Only leaf values are taken from each layer; nested tables are other layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigView {
	factory: String,
	scope_type: Option<&'static str>,
	key: String,
	values: Table,
}

impl ConfigView {
	pub(crate) fn resolve(resources: &Table, factory: &str, scope_type: Option<&'static str>, key: &str) -> Self {
		let mut values = Table::new();
		let base = resources.get(factory).and_then(Value::as_table);
		let key = (!key.is_empty()).then_some(key);

		let scoped = base.zip(scope_type).and_then(|(t, s)| t.get(s)).and_then(Value::as_table);
		let keyed = base.zip(key).and_then(|(t, k)| t.get(k)).and_then(Value::as_table);
		let scoped_keyed = scoped.zip(key).and_then(|(t, k)| t.get(k)).and_then(Value::as_table);

		for layer in [base, scoped, keyed, scoped_keyed].into_iter().flatten() {
			for (name, value) in layer {
				if !value.is_table() {
					values.insert(name.clone(), value.clone());
				}
			}
		}

		Self {
			factory: factory.to_string(),
			scope_type,
			key: key.unwrap_or_default().to_string(),
			values,
		}
	}

	/// Factory the view was resolved for.
	pub fn factory(&self) -> &str {
		&self.factory
	}

	/// Scope kind the view was resolved for, if any.
	pub fn scope_type(&self) -> Option<&'static str> {
		self.scope_type
	}

	/// Configuration key of the resource.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// All resolved settings.
	pub fn values(&self) -> &Table {
		&self.values
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}

	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	pub fn get_int(&self, name: &str) -> Option<i64> {
		self.get(name).and_then(Value::as_integer)
	}

	pub fn get_bool(&self, name: &str) -> Option<bool> {
		self.get(name).and_then(Value::as_bool)
	}

	/// Deserializes the resolved settings into a typed configuration.
	pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, FactoryError> {
		Value::Table(self.values.clone())
			.try_into()
			.map_err(|err| FactoryError::with_source(format!("invalid configuration for factory {}", self.factory), err))
	}
}

#[cfg(test)]
mod tests;
