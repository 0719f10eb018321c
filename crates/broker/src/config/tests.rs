use rstest::rstest;
use serde::Deserialize;

use super::*;

const CONFIG: &str = r#"
shutdown_timeout_ms = 3000

[resources.pool]
url = "postgres://default"
max_connections = 8
tls = false

[resources.pool.job]
max_connections = 2

[resources.pool.orders]
url = "postgres://orders"

[resources.pool.job.orders]
tls = true
"#;

#[test]
fn defaults_when_fields_are_missing() {
	let config = BrokerConfig::from_toml("").unwrap();
	assert_eq!(config, BrokerConfig::default());
	assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
	assert!(!config.prune_auto_scopes_on_close);
}

#[test]
fn parse_error_is_reported() {
	let err = BrokerConfig::from_toml("shutdown_timeout_ms = \"soon\"").unwrap_err();
	assert!(matches!(err, ConfigError::Toml(_)));
}

#[rstest]
#[case::factory_only(None, "", "postgres://default", 8, false)]
#[case::scope_layer(Some("job"), "", "postgres://default", 2, false)]
#[case::key_layer(None, "orders", "postgres://orders", 8, false)]
#[case::scope_and_key(Some("job"), "orders", "postgres://orders", 2, true)]
#[case::unknown_scope(Some("task"), "orders", "postgres://orders", 8, false)]
fn layers_merge_by_specificity(#[case] scope: Option<&'static str>, #[case] key: &str, #[case] url: &str, #[case] max: i64, #[case] tls: bool) {
	let config = BrokerConfig::from_toml(CONFIG).unwrap();
	let view = config.view("pool", scope, key);

	assert_eq!(view.get_str("url"), Some(url));
	assert_eq!(view.get_int("max_connections"), Some(max));
	assert_eq!(view.get_bool("tls"), Some(tls));
	assert!(view.get("job").is_none(), "nested tables are layers, not settings");
}

#[test]
fn unknown_factory_resolves_empty() {
	let config = BrokerConfig::from_toml(CONFIG).unwrap();
	let view = config.view("cache", Some("job"), "orders");
	assert!(view.values().is_empty());
	assert_eq!(view.factory(), "cache");
	assert_eq!(view.scope_type(), Some("job"));
	assert_eq!(view.key(), "orders");
}

#[derive(Debug, Deserialize, PartialEq)]
struct PoolSettings {
	url: String,
	max_connections: u32,
}

#[test]
fn typed_settings() {
	let config = BrokerConfig::from_toml(CONFIG).unwrap();
	let settings: PoolSettings = config.view("pool", Some("job"), "orders").deserialize().unwrap();
	assert_eq!(
		settings,
		PoolSettings {
			url: "postgres://orders".into(),
			max_connections: 2,
		}
	);

	let err = config.view("missing", None, "").deserialize::<PoolSettings>().unwrap_err();
	assert!(err.message().contains("missing"));
}

#[rstest]
#[case::whole_seconds(Duration::from_secs(2), Duration::from_secs(2))]
#[case::sub_second(Duration::from_millis(500), Duration::from_millis(500))]
#[case::rounds_up(Duration::from_micros(1), Duration::from_millis(1))]
#[case::zero(Duration::ZERO, Duration::ZERO)]
fn shutdown_timeout_keeps_milliseconds(#[case] requested: Duration, #[case] effective: Duration) {
	let config = BrokerConfig::default().with_shutdown_timeout(requested);
	assert_eq!(config.shutdown_timeout(), effective);
}

#[test]
fn timeout_from_toml() {
	let config = BrokerConfig::from_toml(CONFIG).unwrap();
	assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
}

#[test]
fn builder_setters() {
	let mut settings = Table::new();
	settings.insert("url".into(), Value::String("memory://".into()));

	let config = BrokerConfig::default()
		.with_shutdown_timeout(Duration::from_secs(1))
		.with_auto_scope_pruning(true)
		.with_resource("pool", settings);

	assert_eq!(config.shutdown_timeout(), Duration::from_secs(1));
	assert!(config.prune_auto_scopes_on_close);
	assert_eq!(config.view("pool", None, "").get_str("url"), Some("memory://"));
}
