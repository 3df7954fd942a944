mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Captioning, Config, LlmProviderConfig, Providers, Relevance, RelevancePolicyKind, Search,
	SearchIndexConfig, Service, Verifier,
};

use std::{fs, path::Path};

const MAX_VERIFIER_BATCH: u32 = 32;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::invalid("service.http_bind", "must be non-empty."));
	}
	if cfg.search.limit == 0 {
		return Err(Error::invalid("search.limit", "must be greater than zero."));
	}
	if cfg.search.max_query_chars == 0 {
		return Err(Error::invalid("search.max_query_chars", "must be greater than zero."));
	}

	validate_relevance(&cfg.relevance)?;

	if cfg.verifier.max_candidates == 0 || cfg.verifier.max_candidates > MAX_VERIFIER_BATCH {
		return Err(Error::invalid(
			"verifier.max_candidates",
			format!("must be in the range 1-{MAX_VERIFIER_BATCH}."),
		));
	}

	unit_interval("verifier.recall_min", cfg.verifier.recall_min)?;

	if cfg.captioning.max_attempts == 0 {
		return Err(Error::invalid("captioning.max_attempts", "must be greater than zero."));
	}
	if cfg.captioning.base_backoff_ms == 0 {
		return Err(Error::invalid("captioning.base_backoff_ms", "must be greater than zero."));
	}
	if cfg.captioning.max_backoff_ms < cfg.captioning.base_backoff_ms {
		return Err(Error::invalid(
			"captioning.max_backoff_ms",
			"must be greater than or equal to captioning.base_backoff_ms.",
		));
	}
	if cfg.captioning.queue_capacity == 0 {
		return Err(Error::invalid("captioning.queue_capacity", "must be greater than zero."));
	}
	if cfg.providers.search_index.index.trim().is_empty() {
		return Err(Error::invalid("providers.search_index.index", "must be non-empty."));
	}

	for (key, api_key) in [
		("providers.search_index.api_key", &cfg.providers.search_index.api_key),
		("providers.judge.api_key", &cfg.providers.judge.api_key),
		("providers.captioner.api_key", &cfg.providers.captioner.api_key),
	] {
		if api_key.trim().is_empty() {
			return Err(Error::invalid(key, "must be non-empty."));
		}
	}
	for (key, api_base) in [
		("providers.search_index.api_base", &cfg.providers.search_index.api_base),
		("providers.judge.api_base", &cfg.providers.judge.api_base),
		("providers.captioner.api_base", &cfg.providers.captioner.api_base),
	] {
		if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
			return Err(Error::invalid(key, "must be an http or https URL."));
		}
	}

	Ok(())
}

fn validate_relevance(relevance: &Relevance) -> Result<()> {
	unit_interval("relevance.absolute_min", relevance.absolute_min)?;
	unit_interval("relevance.strong_threshold", relevance.strong_threshold)?;
	unit_interval("relevance.weak_threshold", relevance.weak_threshold)?;
	unit_interval("relevance.relative_fraction", relevance.relative_fraction)?;

	if relevance.weak_threshold < relevance.absolute_min {
		return Err(Error::invalid(
			"relevance.weak_threshold",
			"must be greater than or equal to relevance.absolute_min.",
		));
	}
	if relevance.strong_threshold < relevance.weak_threshold {
		return Err(Error::invalid(
			"relevance.strong_threshold",
			"must be greater than or equal to relevance.weak_threshold.",
		));
	}
	if relevance.policy == RelevancePolicyKind::Relative && relevance.absolute_min <= 0.0 {
		return Err(Error::invalid(
			"relevance.absolute_min",
			"must be greater than zero when relevance.policy is relative.",
		));
	}

	Ok(())
}

fn unit_interval(key: &'static str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::invalid(key, "must be a finite number."));
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::invalid(key, "must be in the range 0.0-1.0."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in [
		&mut cfg.providers.search_index.api_base,
		&mut cfg.providers.judge.api_base,
		&mut cfg.providers.captioner.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	cfg.providers.search_index.index = cfg.providers.search_index.index.trim().to_string();
}
