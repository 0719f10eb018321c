//! Resource keys.

use std::fmt;
use std::sync::Arc;

/// Identifies one resource among those a factory can produce.
///
/// The configuration key must be stable and collision free per logical key:
/// it is part of the cache slot and selects per-key configuration.
pub trait ResourceKey: Send + Sync {
	/// Canonical string form of this key.
	fn to_configuration_key(&self) -> String;
}

/// Key for factories producing a single resource per scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EmptyKey;

impl ResourceKey for EmptyKey {
	fn to_configuration_key(&self) -> String {
		String::new()
	}
}

/// Key made of a single name, e.g. a bucket or a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedKey(Arc<str>);

impl NamedKey {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self(name.into())
	}

	pub fn name(&self) -> &str {
		&self.0
	}
}

impl ResourceKey for NamedKey {
	fn to_configuration_key(&self) -> String {
		self.0.to_string()
	}
}

impl fmt::Display for NamedKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
