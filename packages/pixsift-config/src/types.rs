use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub search: Search,
	pub relevance: Relevance,
	pub verifier: Verifier,
	pub captioning: Captioning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	pub bind_localhost_only: bool,
	/// Exposes `GET /v1/debug/search`, which returns raw scores and metadata.
	#[serde(default)]
	pub debug_routes: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub search_index: SearchIndexConfig,
	pub judge: LlmProviderConfig,
	pub captioner: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchIndexConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub index: String,
	pub search_path: String,
	pub upsert_path: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// Number of candidates requested from the index per query.
	pub limit: u32,
	pub max_query_chars: u32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RelevancePolicyKind {
	/// Keep `score >= absolute_min`.
	Absolute,
	/// Keep `score >= max(absolute_min, top * relative_fraction)`.
	Relative,
	/// Keep `score >= strong_threshold`, plus scores in `[weak_threshold, strong_threshold)`
	/// that also clear the relative floor.
	TwoTier,
}
impl RelevancePolicyKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Absolute => "absolute",
			Self::Relative => "relative",
			Self::TwoTier => "two_tier",
		}
	}
}

/// Score-only relevance policy. Scores are compared as returned by the index.
#[derive(Debug, Clone, Deserialize)]
pub struct Relevance {
	pub policy: RelevancePolicyKind,
	/// Floor applied by every policy. Drops obviously irrelevant matches regardless of the
	/// best match.
	#[serde(default)]
	pub absolute_min: f64,
	pub strong_threshold: f64,
	pub weak_threshold: f64,
	/// Fraction of the top score a candidate must reach to count as close to the best match.
	pub relative_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Verifier {
	pub enabled: bool,
	/// Upper bound on images sent to the judge in one batch.
	#[serde(default = "default_verifier_max_candidates")]
	pub max_candidates: u32,
	/// Loose recall cut applied instead of the relevance policy when the verifier is on.
	pub recall_min: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Captioning {
	pub max_attempts: u32,
	pub rate_limit_retry_after_ms: u64,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
	#[serde(default = "default_queue_capacity")]
	pub queue_capacity: u32,
}

fn default_verifier_max_candidates() -> u32 {
	10
}

fn default_queue_capacity() -> u32 {
	256
}
