use serde::Serialize;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use pixsift_domain::{
	candidate::{self, ImageDescriptor},
	query,
	threshold::{self, Thresholds},
};

use crate::{Error, PixsiftService, Result};

const CONTENT_PREVIEW_GRAPHEMES: usize = 200;

#[derive(Clone, Debug, Serialize)]
pub struct DebugSearchResponse {
	pub query: String,
	pub result_count: usize,
	pub provider_id: String,
	pub index: String,
	pub thresholds: Thresholds,
	pub results: Vec<DebugCandidate>,
}

/// One raw index hit with the decisions the pipeline would make about it.
#[derive(Clone, Debug, Serialize)]
pub struct DebugCandidate {
	pub id: String,
	pub score: f64,
	pub metadata: Option<Value>,
	pub content_preview: Option<String>,
	pub renderable: bool,
	pub passed_threshold: bool,
}

impl PixsiftService {
	/// Raw retrieval view for operators. Runs the configured threshold policy for display but
	/// never calls the judge.
	pub async fn debug_search(&self, raw_query: &str) -> Result<DebugSearchResponse> {
		let query = query::normalize_query(raw_query, self.cfg.search.max_query_chars)
			.map_err(|reason| Error::InvalidQuery { message: reason.message() })?;
		let mut hits = self.fetch_hits(&query).await?;

		candidate::sort_desc_by(&mut hits, |hit| hit.candidate.score);

		let sorted: Vec<_> = hits.iter().map(|hit| hit.candidate.clone()).collect();
		let top = candidate::top_score(&sorted);
		let policy = threshold::resolve_policy(&self.cfg.relevance);
		let decisions = threshold::classify(policy.as_ref(), &sorted);
		let results: Vec<DebugCandidate> = hits
			.into_iter()
			.zip(decisions)
			.map(|(hit, passed_threshold)| DebugCandidate {
				renderable: ImageDescriptor::from_metadata(hit.candidate.metadata.as_ref())
					.is_some(),
				content_preview: hit.content.as_ref().and_then(content_preview),
				id: hit.candidate.id,
				score: hit.candidate.score,
				metadata: hit.candidate.metadata,
				passed_threshold,
			})
			.collect();
		let cfg = &self.cfg.providers.search_index;

		tracing::debug!(result_count = results.len(), top_score = top, "Debug search completed.");

		Ok(DebugSearchResponse {
			query,
			result_count: results.len(),
			provider_id: cfg.provider_id.clone(),
			index: cfg.index.clone(),
			thresholds: threshold::thresholds(&self.cfg.relevance, top),
			results,
		})
	}
}

fn content_preview(content: &Value) -> Option<String> {
	let text = match content {
		Value::String(text) => text.clone(),
		Value::Object(map) => match map.get("description") {
			Some(Value::String(text)) => text.clone(),
			_ => content.to_string(),
		},
		Value::Null => return None,
		other => other.to_string(),
	};

	Some(truncate_graphemes(&text, CONTENT_PREVIEW_GRAPHEMES))
}

fn truncate_graphemes(text: &str, max: usize) -> String {
	match text.grapheme_indices(true).nth(max) {
		Some((cut, _)) => text[..cut].to_string(),
		None => text.to_string(),
	}
}
