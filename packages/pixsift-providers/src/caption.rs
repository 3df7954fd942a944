use serde_json::Value;

use pixsift_config::LlmProviderConfig;
use pixsift_domain::candidate::ImageDescriptor;

use crate::{Error, Result};

const CAPTION_SYSTEM_PROMPT: &str = "\
You describe images for a searchable image database. Describe the image in detail.
Include, when present:
- People: gender, approximate age, clothing with colors and types, accessories, hair, expressions.
- Objects: what they are, colors, sizes, brands when visible.
- Setting: indoor or outdoor, kind of location, time of day.
- Actions: what is happening, poses, activities.
- Colors: name prominent colors explicitly.
- Text: any visible text or signs.
Use common search terms and be specific, for example \"man in blue t-shirt\" rather than \
\"person wearing clothes\".";

pub async fn caption(cfg: &LlmProviderConfig, image: &ImageDescriptor) -> Result<String> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": build_messages(image),
	});
	let json = crate::post_json(
		&client,
		&url,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;

	parse_caption_response(&json)
}

fn build_messages(image: &ImageDescriptor) -> Vec<Value> {
	let mut image_url = serde_json::json!({ "url": image.fetch_url() });

	if let Some(content_type) = image.content_type.as_deref() {
		image_url["mime_type"] = Value::String(content_type.to_string());
	}

	vec![
		serde_json::json!({ "role": "system", "content": CAPTION_SYSTEM_PROMPT }),
		serde_json::json!({
			"role": "user",
			"content": [{ "type": "image_url", "image_url": image_url }],
		}),
	]
}

fn parse_caption_response(json: &Value) -> Result<String> {
	let text = crate::chat_content(json)
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.ok_or_else(|| Error::invalid_response("Caption response is missing message content."))?;

	Ok(text.to_string())
}
