use std::fmt::Debug;

use serde::Serialize;

use pixsift_config::{Relevance, RelevancePolicyKind};

use crate::candidate::{Candidate, top_score};

/// Decides survival of a candidate from its score and the best score of the same result set.
pub trait ThresholdPolicy
where
	Self: Debug + Send + Sync,
{
	fn admits(&self, score: f64, top: f64) -> bool;
}

/// `score >= min`.
#[derive(Clone, Copy, Debug)]
pub struct AbsoluteFloor {
	pub min: f64,
}
impl ThresholdPolicy for AbsoluteFloor {
	fn admits(&self, score: f64, _top: f64) -> bool {
		score >= self.min
	}
}

/// `score >= max(floor, top * fraction)`.
///
/// The floor keeps an empty or all-zero result set from producing a zero cut-off.
#[derive(Clone, Copy, Debug)]
pub struct RelativeFloor {
	pub fraction: f64,
	pub floor: f64,
}
impl RelativeFloor {
	pub fn threshold(&self, top: f64) -> f64 {
		(top * self.fraction).max(self.floor)
	}
}
impl ThresholdPolicy for RelativeFloor {
	fn admits(&self, score: f64, top: f64) -> bool {
		score >= self.threshold(top)
	}
}

/// Keeps every strong match. Weak matches are kept only while they stay close to the best one.
#[derive(Clone, Copy, Debug)]
pub struct TwoTier {
	pub strong: f64,
	pub weak: f64,
	pub relative: RelativeFloor,
}
impl ThresholdPolicy for TwoTier {
	fn admits(&self, score: f64, top: f64) -> bool {
		if score >= self.strong {
			return true;
		}

		score >= self.weak && self.relative.admits(score, top)
	}
}

/// Conjunction of policies. An empty set admits everything.
#[derive(Debug, Default)]
pub struct AllOf {
	policies: Vec<Box<dyn ThresholdPolicy>>,
}
impl AllOf {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, policy: impl ThresholdPolicy + 'static) -> Self {
		self.policies.push(Box::new(policy));

		self
	}
}
impl ThresholdPolicy for AllOf {
	fn admits(&self, score: f64, top: f64) -> bool {
		self.policies.iter().all(|policy| policy.admits(score, top))
	}
}

/// Cut-offs computed for one result set, reported for diagnostics only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Thresholds {
	pub policy: &'static str,
	pub top_score: f64,
	pub absolute_min: f64,
	pub strong_threshold: f64,
	pub weak_threshold: f64,
	pub relative_threshold: f64,
}

pub fn resolve_policy(cfg: &Relevance) -> Box<dyn ThresholdPolicy> {
	let absolute = AbsoluteFloor { min: cfg.absolute_min };
	let relative = RelativeFloor { fraction: cfg.relative_fraction, floor: cfg.absolute_min };

	match cfg.policy {
		RelevancePolicyKind::Absolute => Box::new(absolute),
		RelevancePolicyKind::Relative => Box::new(relative),
		RelevancePolicyKind::TwoTier => Box::new(AllOf::new().with(absolute).with(TwoTier {
			strong: cfg.strong_threshold,
			weak: cfg.weak_threshold,
			relative,
		})),
	}
}

/// One decision per sorted candidate, in the same order.
pub fn classify(policy: &dyn ThresholdPolicy, sorted: &[Candidate]) -> Vec<bool> {
	let top = top_score(sorted);

	sorted.iter().map(|candidate| policy.admits(candidate.score, top)).collect()
}

pub fn thresholds(cfg: &Relevance, top: f64) -> Thresholds {
	let relative = RelativeFloor { fraction: cfg.relative_fraction, floor: cfg.absolute_min };

	Thresholds {
		policy: cfg.policy.as_str(),
		top_score: top,
		absolute_min: cfg.absolute_min,
		strong_threshold: cfg.strong_threshold,
		weak_threshold: cfg.weak_threshold,
		relative_threshold: relative.threshold(top),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn relative_floor_never_drops_to_zero() {
		let floor = RelativeFloor { fraction: 0.75, floor: 0.1 };

		assert_eq!(floor.threshold(0.0), 0.1);
		assert!(!floor.admits(0.0, 0.0));
		assert!(floor.admits(0.1, 0.0));
	}

	#[test]
	fn two_tier_keeps_strong_matches_regardless_of_top() {
		let policy = TwoTier {
			strong: 0.6,
			weak: 0.4,
			relative: RelativeFloor { fraction: 0.75, floor: 0.0 },
		};

		assert!(policy.admits(0.61, 1.0));
		assert!(!policy.admits(0.59, 1.0));
		assert!(policy.admits(0.59, 0.7));
		assert!(!policy.admits(0.39, 0.4));
	}

	#[test]
	fn empty_all_of_admits_everything() {
		assert!(AllOf::new().admits(0.0, 1.0));
	}
}
