use serde::Serialize;
use serde_json::Value;

use pixsift_config::SearchIndexConfig;
use pixsift_domain::candidate::{Candidate, ImageDescriptor};

use crate::{Error, Result};

/// One raw search result. `content` is the indexed text and is only used for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexHit {
	pub candidate: Candidate,
	pub content: Option<Value>,
}

/// Searchable record for one image: its caption as content, its descriptor as metadata.
#[derive(Clone, Debug, Serialize)]
pub struct IndexDocument {
	pub id: String,
	pub content: DocumentContent,
	pub metadata: ImageDescriptor,
}

#[derive(Clone, Debug, Serialize)]
pub struct DocumentContent {
	pub description: String,
}

impl IndexDocument {
	/// The id is derived from the image URL so re-indexing an image replaces its document.
	pub fn for_image(image: ImageDescriptor, description: String) -> Self {
		Self {
			id: document_id(&image.url),
			content: DocumentContent { description },
			metadata: image,
		}
	}
}

pub fn document_id(url: &str) -> String {
	blake3::hash(url.as_bytes()).to_hex().to_string()
}

pub async fn search(cfg: &SearchIndexConfig, query: &str, limit: u32) -> Result<Vec<IndexHit>> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = endpoint(cfg, &cfg.search_path);
	let body = serde_json::json!({
		"query": query,
		"topK": limit,
		"includeMetadata": true,
	});
	let json = crate::post_json(
		&client,
		&url,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;

	parse_search_response(json)
}

pub async fn upsert(cfg: &SearchIndexConfig, doc: &IndexDocument) -> Result<()> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = endpoint(cfg, &cfg.upsert_path);

	crate::post_json(
		&client,
		&url,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		std::slice::from_ref(doc),
	)
	.await?;

	Ok(())
}

fn endpoint(cfg: &SearchIndexConfig, path: &str) -> String {
	format!("{}{}/{}", cfg.api_base, path.trim_end_matches('/'), cfg.index)
}

fn parse_search_response(json: Value) -> Result<Vec<IndexHit>> {
	let items = json
		.as_array()
		.or_else(|| json.get("result").and_then(|v| v.as_array()))
		.or_else(|| json.get("results").and_then(|v| v.as_array()))
		.ok_or_else(|| Error::invalid_response("Search response is missing a result array."))?;

	let mut hits = Vec::with_capacity(items.len());

	for item in items {
		let id = match item.get("id") {
			Some(Value::String(id)) => id.clone(),
			Some(Value::Number(id)) => id.to_string(),
			_ => return Err(Error::invalid_response("Search result is missing an id.")),
		};
		let score = item
			.get("score")
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::invalid_response(format!("Search result {id} has no score.")))?;

		if !score.is_finite() {
			return Err(Error::invalid_response(format!(
				"Search result {id} has a non-finite score."
			)));
		}

		let metadata = item.get("metadata").filter(|v| !v.is_null()).cloned();
		let content = item.get("content").filter(|v| !v.is_null()).cloned();

		hits.push(IndexHit { candidate: Candidate { id, score, metadata }, content });
	}

	Ok(hits)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_wrapped_and_bare_result_arrays() {
		let wrapped = serde_json::json!({
			"result": [
				{ "id": "a", "score": 0.8, "metadata": { "url": "https://blob.test/a.png" } },
				{ "id": 7, "score": 0.3, "metadata": null, "content": { "description": "dog" } }
			]
		});
		let hits = parse_search_response(wrapped).expect("Response must parse.");

		assert_eq!(hits.len(), 2);
		assert_eq!(hits[1].candidate.id, "7");
		assert!(hits[1].candidate.metadata.is_none());
		assert!(hits[1].content.is_some());

		let bare = serde_json::json!([{ "id": "b", "score": 1 }]);
		let hits = parse_search_response(bare).expect("Response must parse.");

		assert_eq!(hits[0].candidate.score, 1.0);
	}

	#[test]
	fn rejects_results_without_scores() {
		let json = serde_json::json!({ "result": [{ "id": "a" }] });

		assert!(parse_search_response(json).is_err());
		assert!(parse_search_response(serde_json::json!({ "ok": true })).is_err());
	}

	#[test]
	fn keeps_full_precision_and_unbounded_scores() {
		let json = serde_json::json!([
			{ "id": "edge", "score": 0.59999999999 },
			{ "id": "large", "score": 1e39 }
		]);
		let hits = parse_search_response(json).expect("Response must parse.");

		assert_eq!(hits[0].candidate.score, 0.59999999999);
		assert!(hits[0].candidate.score < 0.6);
		assert_eq!(hits[1].candidate.score, 1e39);
	}

	#[test]
	fn rejects_scores_that_are_not_finite_numbers() {
		for score in [
			serde_json::json!(f64::NAN),
			serde_json::json!(f64::INFINITY),
			serde_json::json!("NaN"),
			serde_json::json!("Infinity"),
		] {
			let json = serde_json::json!([{ "id": "a", "score": score }]);

			assert!(parse_search_response(json).is_err(), "Accepted score {score}.");
		}
	}

	#[test]
	fn document_id_is_stable_per_url() {
		assert_eq!(document_id("https://blob.test/a.png"), document_id("https://blob.test/a.png"));
		assert_ne!(document_id("https://blob.test/a.png"), document_id("https://blob.test/b.png"));
		assert_eq!(document_id("x").len(), 64);
	}
}
