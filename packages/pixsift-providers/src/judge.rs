use serde::Deserialize;
use serde_json::Value;

use pixsift_config::LlmProviderConfig;
use pixsift_domain::verdict::Verdict;

use crate::{Error, Result};

const JUDGE_SYSTEM_PROMPT: &str = "\
You verify image search results. You receive a search query and a numbered list of images.
For every image decide whether it satisfies the literal query.
Be strict: mark an image relevant only when it clearly and unambiguously matches every part of \
the query, including colors, objects, people, and actions it names. Similar or partially \
matching images are not relevant. When unsure, answer false.
Respond with JSON only, in the form {\"verdicts\":[{\"index\":0,\"relevant\":true}]}, with \
exactly one entry for every image index.";

#[derive(Debug, Deserialize)]
struct JudgeReply {
	verdicts: Vec<Verdict>,
}

/// Asks the judge model about every image in one request. The reply is decoded but not checked
/// for index coverage.
pub async fn judge(
	cfg: &LlmProviderConfig,
	query: &str,
	image_urls: &[String],
) -> Result<Vec<Verdict>> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"response_format": { "type": "json_object" },
		"messages": build_messages(query, image_urls),
	});
	let json = crate::post_json(
		&client,
		&url,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;

	parse_judge_response(&json)
}

pub fn build_messages(query: &str, image_urls: &[String]) -> Vec<Value> {
	let last = image_urls.len().saturating_sub(1);
	let mut content = vec![serde_json::json!({
		"type": "text",
		"text": format!(
			"Search query: \"{query}\"\nThere are {} images, numbered 0 to {last} in the order shown.",
			image_urls.len()
		),
	})];

	for (index, url) in image_urls.iter().enumerate() {
		content.push(serde_json::json!({ "type": "text", "text": format!("Image {index}:") }));
		content.push(serde_json::json!({ "type": "image_url", "image_url": { "url": url } }));
	}

	vec![
		serde_json::json!({ "role": "system", "content": JUDGE_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": content }),
	]
}

fn parse_judge_response(json: &Value) -> Result<Vec<Verdict>> {
	let content = crate::chat_content(json)
		.ok_or_else(|| Error::invalid_response("Judge response is missing message content."))?;
	let reply: JudgeReply = serde_json::from_str(strip_code_fence(content))
		.map_err(|err| Error::invalid_response(format!("Judge content is not valid JSON: {err}")))?;

	Ok(reply.verdicts)
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(inner) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let inner = inner.strip_prefix("json").unwrap_or(inner);

	inner.strip_suffix("```").unwrap_or(inner).trim()
}
