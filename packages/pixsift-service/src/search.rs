use serde::{Deserialize, Serialize};

use pixsift_domain::{
	candidate::{self, Candidate, ImageDescriptor, ScoredCandidate},
	query,
	threshold::{self, AbsoluteFloor, Thresholds},
};
use pixsift_providers::search_index::IndexHit;

use crate::{Error, PixsiftService, Result, VerificationOutcome, Verifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	/// Attach counts, thresholds, and raw scores to the outcome.
	#[serde(default)]
	pub diagnostics: bool,
}

/// Caller-facing result: exactly one of `data` or `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchOutcome {
	Data {
		data: Vec<ImageDescriptor>,
		#[serde(skip_serializing_if = "Option::is_none")]
		diagnostics: Option<SearchDiagnostics>,
	},
	Error {
		error: String,
	},
}
impl SearchOutcome {
	pub fn from_result(result: Result<RelevanceResult>, diagnostics: bool) -> Self {
		match result {
			Ok(result) => Self::Data {
				data: result.images,
				diagnostics: diagnostics.then_some(result.diagnostics),
			},
			Err(err) => Self::Error { error: err.to_string() },
		}
	}

	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error { .. })
	}
}

/// Which cut decided the first pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
	/// The configured relevance policy.
	Threshold,
	/// The loose recall cut followed by the judge.
	Verifier,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchDiagnostics {
	pub gate: Gate,
	pub raw_count: usize,
	/// Candidates left after the first cut, before verification.
	pub filtered_count: usize,
	pub result_count: usize,
	pub thresholds: Thresholds,
	pub raw_scores: Vec<f64>,
	pub verification: VerificationOutcome,
}

#[derive(Clone, Debug)]
pub struct RelevanceResult {
	pub images: Vec<ImageDescriptor>,
	pub diagnostics: SearchDiagnostics,
}

impl PixsiftService {
	/// Runs the relevance pipeline and folds every failure into a single message.
	pub async fn search(&self, req: SearchRequest) -> SearchOutcome {
		SearchOutcome::from_result(self.search_images(&req.query).await, req.diagnostics)
	}

	/// Retrieve, sort, cut, and optionally verify. Each stage runs once.
	pub async fn search_images(&self, raw_query: &str) -> Result<RelevanceResult> {
		let query = query::normalize_query(raw_query, self.cfg.search.max_query_chars)
			.map_err(|reason| Error::InvalidQuery { message: reason.message() })?;
		let sorted = self.retrieve(&query).await?;
		let top = candidate::top_score(&sorted);
		let thresholds = threshold::thresholds(&self.cfg.relevance, top);
		let raw_scores: Vec<f64> = sorted.iter().map(|candidate| candidate.score).collect();

		tracing::debug!(
			raw_count = sorted.len(),
			top_score = top,
			relative_threshold = thresholds.relative_threshold,
			"Candidates retrieved."
		);

		let (gate, filtered, survivors, verification) = if self.cfg.verifier.enabled {
			let recall = AbsoluteFloor { min: self.cfg.verifier.recall_min };
			let pool = passing(&sorted, &threshold::classify(&recall, &sorted));
			let filtered = pool.len();
			let verifier = Verifier {
				judge: self.providers.judge.as_ref(),
				cfg: &self.cfg.providers.judge,
				max_candidates: self.cfg.verifier.max_candidates as usize,
			};
			let (survivors, verification) = verifier.verify(&query, pool).await;

			(Gate::Verifier, filtered, survivors, verification)
		} else {
			let policy = threshold::resolve_policy(&self.cfg.relevance);
			let survivors = passing(&sorted, &threshold::classify(policy.as_ref(), &sorted));

			(Gate::Threshold, survivors.len(), survivors, VerificationOutcome::Skipped)
		};
		let images: Vec<ImageDescriptor> =
			survivors.into_iter().map(|candidate| candidate.image).collect();

		tracing::info!(
			query_chars = query.chars().count(),
			raw_count = sorted.len(),
			filtered_count = filtered,
			result_count = images.len(),
			"Search completed."
		);

		let diagnostics = SearchDiagnostics {
			gate,
			raw_count: sorted.len(),
			filtered_count: filtered,
			result_count: images.len(),
			thresholds,
			raw_scores,
			verification,
		};

		Ok(RelevanceResult { images, diagnostics })
	}

	/// Sorted candidates for an already normalized query.
	pub(crate) async fn retrieve(&self, query: &str) -> Result<Vec<Candidate>> {
		let hits = self.fetch_hits(query).await?;

		Ok(candidate::sort_by_score(hits.into_iter().map(|hit| hit.candidate).collect()))
	}

	/// Raw index hits in retrieval order. Every score is finite.
	pub(crate) async fn fetch_hits(&self, query: &str) -> Result<Vec<IndexHit>> {
		let cfg = &self.cfg.providers.search_index;

		let hits =
			self.providers.index.search(cfg, query, self.cfg.search.limit).await.map_err(|err| {
				tracing::error!(
					error = %err,
					provider_id = cfg.provider_id.as_str(),
					index = cfg.index.as_str(),
					"Search index request failed."
				);

				Error::Retrieval { message: err.to_string() }
			})?;

		if let Some(hit) = hits.iter().find(|hit| !hit.candidate.score.is_finite()) {
			tracing::error!(
				id = hit.candidate.id.as_str(),
				provider_id = cfg.provider_id.as_str(),
				"Search index returned a non-finite score."
			);

			return Err(Error::Retrieval {
				message: format!("Search result {} has a non-finite score.", hit.candidate.id),
			});
		}

		Ok(hits)
	}
}

fn passing(sorted: &[Candidate], decisions: &[bool]) -> Vec<ScoredCandidate> {
	candidate::renderable(sorted, decisions)
		.into_iter()
		.filter(|candidate| candidate.passed_threshold)
		.collect()
}
