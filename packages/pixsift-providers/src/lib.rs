pub mod caption;
pub mod judge;
pub mod search_index;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde::Serialize;
use serde_json::{Map, Value};

const MAX_ERROR_BODY_CHARS: usize = 512;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}

/// Posts `body` and decodes a JSON reply. Non-2xx replies become [`Error::Status`] carrying a
/// truncated copy of the response body.
pub(crate) async fn post_json<B>(
	client: &Client,
	url: &str,
	headers: HeaderMap,
	body: &B,
) -> Result<Value>
where
	B: Serialize + ?Sized,
{
	let res = client.post(url).headers(headers).json(body).send().await?;
	let status = res.status();

	if !status.is_success() {
		let text = res.text().await.unwrap_or_default();

		return Err(Error::Status { status: status.as_u16(), body: truncate(&text) });
	}

	Ok(res.json().await?)
}

/// Reads `choices[0].message.content` from an OpenAI-compatible chat completion.
pub(crate) fn chat_content(json: &Value) -> Option<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
}

fn truncate(text: &str) -> String {
	if text.chars().count() <= MAX_ERROR_BODY_CHARS {
		return text.to_string();
	}

	let mut out: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();

	out.push_str("...");

	out
}
