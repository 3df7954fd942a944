use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One scored retrieval result, exactly as the index returned it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub id: String,
	pub score: f64,
	pub metadata: Option<Value>,
}

/// Object-storage upload result stored beside each indexed image.
///
/// Only `url` is required. Unknown keys survive a round trip so the caller receives the record
/// it stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
	pub url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub download_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pathname: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_disposition: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl ImageDescriptor {
	/// Returns `None` when the metadata cannot be rendered: null, not an object, or no `url`.
	pub fn from_metadata(metadata: Option<&Value>) -> Option<Self> {
		let metadata = metadata?;

		if !metadata.is_object() {
			return None;
		}

		let descriptor: Self = serde_json::from_value(metadata.clone()).ok()?;

		if descriptor.url.trim().is_empty() {
			return None;
		}

		Some(descriptor)
	}

	/// URL handed to models that need to fetch the image bytes.
	pub fn fetch_url(&self) -> &str {
		self.download_url.as_deref().filter(|url| !url.trim().is_empty()).unwrap_or(&self.url)
	}
}

/// A candidate that survived sorting and can be shown to a user.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredCandidate {
	pub id: String,
	pub score: f64,
	/// Position in the sorted candidate list.
	pub rank: usize,
	pub image: ImageDescriptor,
	pub passed_threshold: bool,
}

/// Sorts by score, highest first. Equal scores keep retrieval order.
pub fn sort_by_score(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
	sort_desc_by(&mut candidates, |candidate| candidate.score);

	candidates
}

/// Stable descending sort on an extracted score.
pub fn sort_desc_by<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
	items.sort_by(|a, b| score(b).total_cmp(&score(a)));
}

/// Best score of a sorted list, or zero when the list is empty.
pub fn top_score(sorted: &[Candidate]) -> f64 {
	sorted.first().map(|candidate| candidate.score).unwrap_or(0.0)
}

/// Pairs sorted candidates with their threshold decisions, dropping unrenderable metadata and
/// repeated ids. The first occurrence of an id wins.
pub fn renderable(sorted: &[Candidate], decisions: &[bool]) -> Vec<ScoredCandidate> {
	let mut seen = HashSet::with_capacity(sorted.len());
	let mut out = Vec::with_capacity(sorted.len());

	for (rank, (candidate, passed)) in sorted.iter().zip(decisions).enumerate() {
		let Some(image) = ImageDescriptor::from_metadata(candidate.metadata.as_ref()) else {
			continue;
		};

		if !seen.insert(candidate.id.as_str()) {
			continue;
		}

		out.push(ScoredCandidate {
			id: candidate.id.clone(),
			score: candidate.score,
			rank,
			image,
			passed_threshold: *passed,
		});
	}

	out
}
