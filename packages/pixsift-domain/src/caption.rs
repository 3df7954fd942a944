use std::{sync::LazyLock, time::Duration};

use regex::Regex;

use pixsift_config::Captioning;

static RATE_LIMITED: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)rate[ _-]?limit|\b429\b|quota").ok());
static INVALID_INPUT: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)invalid image|unsupported|\b400\b").ok());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionFailureKind {
	/// Upstream throttling. Retried after a long pause.
	RateLimited,
	/// The image itself cannot be captioned. Never retried.
	InvalidInput,
	/// Anything else. Retried with exponential backoff.
	Transient,
}

/// What the worker does after a failed captioning attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	RetryAfter(Duration),
	GiveUp,
}

/// Classifies a captioning failure from its HTTP status, when known, and its message.
pub fn classify(status: Option<u16>, message: &str) -> CaptionFailureKind {
	match status {
		Some(429) => return CaptionFailureKind::RateLimited,
		Some(400 | 415 | 422) => return CaptionFailureKind::InvalidInput,
		_ => {},
	}

	if matches_pattern(&RATE_LIMITED, message) {
		return CaptionFailureKind::RateLimited;
	}
	if matches_pattern(&INVALID_INPUT, message) {
		return CaptionFailureKind::InvalidInput;
	}

	CaptionFailureKind::Transient
}

fn matches_pattern(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
	pattern.as_ref().is_some_and(|re| re.is_match(text))
}

/// `attempt` is the 1-based number of the attempt that just failed.
pub fn retry_decision(cfg: &Captioning, kind: CaptionFailureKind, attempt: u32) -> RetryDecision {
	if kind == CaptionFailureKind::InvalidInput || attempt >= cfg.max_attempts {
		return RetryDecision::GiveUp;
	}

	match kind {
		CaptionFailureKind::RateLimited =>
			RetryDecision::RetryAfter(Duration::from_millis(cfg.rate_limit_retry_after_ms)),
		_ => RetryDecision::RetryAfter(backoff_for_attempt(cfg, attempt)),
	}
}

/// `base * 2^(attempt - 1)`, capped at the configured maximum.
pub fn backoff_for_attempt(cfg: &Captioning, attempt: u32) -> Duration {
	let exp = attempt.max(1).saturating_sub(1).min(16);
	let base = cfg.base_backoff_ms.saturating_mul(1 << exp);

	Duration::from_millis(base.min(cfg.max_backoff_ms))
}
