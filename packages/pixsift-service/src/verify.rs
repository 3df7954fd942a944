use serde::Serialize;

use pixsift_config::LlmProviderConfig;
use pixsift_domain::{candidate::ScoredCandidate, verdict};

use crate::RelevanceJudge;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
	/// Verification disabled, or nothing to verify.
	Skipped,
	Applied { submitted: usize, kept: usize },
	/// The judge failed or answered out of contract; every submitted candidate was kept.
	FailedOpen { submitted: usize, reason: String },
}

/// Sends up to `max_candidates` images to the judge in one batch and keeps the ones it marks
/// relevant, in their original order.
pub struct Verifier<'a> {
	pub judge: &'a dyn RelevanceJudge,
	pub cfg: &'a LlmProviderConfig,
	pub max_candidates: usize,
}
impl Verifier<'_> {
	/// Never fails. A judge error or a reply that does not cover every submitted index exactly
	/// once returns the submitted candidates unchanged.
	pub async fn verify(
		&self,
		query: &str,
		mut candidates: Vec<ScoredCandidate>,
	) -> (Vec<ScoredCandidate>, VerificationOutcome) {
		candidates.truncate(self.max_candidates);

		if candidates.is_empty() {
			return (candidates, VerificationOutcome::Skipped);
		}

		let submitted = candidates.len();
		let image_urls: Vec<String> =
			candidates.iter().map(|candidate| candidate.image.fetch_url().to_string()).collect();
		let verdicts = match self.judge.judge(self.cfg, query, &image_urls).await {
			Ok(verdicts) => verdicts,
			Err(err) => return fail_open(candidates, err.to_string()),
		};
		let flags = match verdict::validate(&verdicts, submitted) {
			Ok(flags) => flags,
			Err(err) => return fail_open(candidates, err.to_string()),
		};
		let kept: Vec<ScoredCandidate> = candidates
			.into_iter()
			.zip(flags)
			.filter_map(|(candidate, relevant)| relevant.then_some(candidate))
			.collect();

		tracing::debug!(
			provider_id = self.cfg.provider_id.as_str(),
			submitted,
			kept = kept.len(),
			"Verification applied."
		);

		let outcome = VerificationOutcome::Applied { submitted, kept: kept.len() };

		(kept, outcome)
	}
}

fn fail_open(
	candidates: Vec<ScoredCandidate>,
	reason: String,
) -> (Vec<ScoredCandidate>, VerificationOutcome) {
	tracing::warn!(
		submitted = candidates.len(),
		reason = reason.as_str(),
		"Verification failed. Keeping unverified candidates."
	);

	let outcome = VerificationOutcome::FailedOpen { submitted: candidates.len(), reason };

	(candidates, outcome)
}
