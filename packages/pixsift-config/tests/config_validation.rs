use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use pixsift_config::{Config, Error, RelevancePolicyKind};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root
		.as_table_mut()
		.and_then(|root| root.get_mut(section))
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Template config must include [{section}]."));

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("pixsift_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> pixsift_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = pixsift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes_api_base() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string())
		.expect("Sample config must be valid.");

	assert_eq!(cfg.providers.search_index.api_base, "https://search.example.test");
	assert_eq!(cfg.relevance.policy, RelevancePolicyKind::TwoTier);
	assert_eq!(cfg.verifier.max_candidates, 10);
	assert!(!cfg.service.debug_routes);
}

#[test]
fn missing_file_is_a_read_error() {
	let path = env::temp_dir().join("pixsift_config_test_missing.toml");
	let err = pixsift_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn unknown_policy_is_a_parse_error() {
	let payload = sample_toml_with("relevance", "policy", Value::String("fuzzy".to_string()));
	let err = load_payload(payload).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn strong_threshold_must_not_be_below_weak_threshold() {
	let payload = sample_toml_with("relevance", "strong_threshold", Value::Float(0.3));
	let err = load_payload(payload).expect_err("Expected threshold ordering error.");

	assert_eq!(
		err.to_string(),
		"relevance.strong_threshold must be greater than or equal to relevance.weak_threshold."
	);
}

#[test]
fn weak_threshold_must_not_be_below_absolute_min() {
	let mut cfg = base_config();

	cfg.relevance.absolute_min = 0.5;

	let err = pixsift_config::validate(&cfg).expect_err("Expected floor ordering error.");

	assert!(err.to_string().starts_with("relevance.weak_threshold"), "Unexpected error: {err}");
}

#[test]
fn relevance_values_must_be_finite_and_bounded() {
	let mut cfg = base_config();

	cfg.relevance.relative_fraction = f64::NAN;

	let err = pixsift_config::validate(&cfg).expect_err("Expected finite-number error.");

	assert_eq!(err.to_string(), "relevance.relative_fraction must be a finite number.");

	let mut cfg = base_config();

	cfg.relevance.relative_fraction = 1.5;

	let err = pixsift_config::validate(&cfg).expect_err("Expected range error.");

	assert_eq!(err.to_string(), "relevance.relative_fraction must be in the range 0.0-1.0.");
}

#[test]
fn relative_policy_requires_positive_floor() {
	let mut cfg = base_config();

	cfg.relevance.policy = RelevancePolicyKind::Relative;

	let err = pixsift_config::validate(&cfg).expect_err("Expected zero-floor error.");

	assert!(err.to_string().starts_with("relevance.absolute_min"), "Unexpected error: {err}");

	cfg.relevance.absolute_min = 0.1;

	assert!(pixsift_config::validate(&cfg).is_ok());
}

#[test]
fn verifier_batch_is_bounded() {
	let mut cfg = base_config();

	cfg.verifier.max_candidates = 0;

	assert!(pixsift_config::validate(&cfg).is_err());

	cfg.verifier.max_candidates = 33;

	assert!(pixsift_config::validate(&cfg).is_err());

	cfg.verifier.max_candidates = 32;

	assert!(pixsift_config::validate(&cfg).is_ok());
}

#[test]
fn captioning_backoff_bounds_are_ordered() {
	let payload = sample_toml_with("captioning", "max_backoff_ms", Value::Integer(100));
	let err = load_payload(payload).expect_err("Expected backoff ordering error.");

	assert!(err.to_string().starts_with("captioning.max_backoff_ms"), "Unexpected error: {err}");
}

#[test]
fn provider_api_keys_must_be_non_empty() {
	let mut cfg = base_config();

	cfg.providers.judge.api_key = "  ".to_string();

	let err = pixsift_config::validate(&cfg).expect_err("Expected api_key error.");

	assert_eq!(err.to_string(), "providers.judge.api_key must be non-empty.");
}

#[test]
fn search_limit_must_be_positive() {
	let payload = sample_toml_with("search", "limit", Value::Integer(0));
	let err = load_payload(payload).expect_err("Expected limit error.");

	assert_eq!(err.to_string(), "search.limit must be greater than zero.");
}
