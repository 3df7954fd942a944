mod error;

pub use error::{Error, Result};

use std::{
	collections::VecDeque,
	net::SocketAddr,
	sync::{Arc, Mutex},
};

use axum::{
	Router,
	body::Bytes,
	extract::State,
	http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION},
	response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, task::JoinHandle};

use pixsift_config::{
	Captioning, Config, LlmProviderConfig, Providers, Relevance, RelevancePolicyKind, Search,
	SearchIndexConfig, Service, Verifier,
};

/// A complete, valid configuration whose providers all point at `base_url`.
pub fn test_config(base_url: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			bind_localhost_only: true,
			debug_routes: true,
		},
		providers: Providers {
			search_index: SearchIndexConfig {
				provider_id: "test-index".to_string(),
				api_base: base_url.to_string(),
				api_key: "index-key".to_string(),
				index: "images".to_string(),
				search_path: "/search".to_string(),
				upsert_path: "/upsert".to_string(),
				timeout_ms: 2_000,
				default_headers: Map::new(),
			},
			judge: llm_provider(base_url, "judge-key"),
			captioner: llm_provider(base_url, "caption-key"),
		},
		search: Search { limit: 20, max_query_chars: 256 },
		relevance: Relevance {
			policy: RelevancePolicyKind::TwoTier,
			absolute_min: 0.0,
			strong_threshold: 0.6,
			weak_threshold: 0.4,
			relative_fraction: 0.75,
		},
		verifier: Verifier { enabled: false, max_candidates: 10, recall_min: 0.2 },
		captioning: Captioning {
			max_attempts: 5,
			rate_limit_retry_after_ms: 20,
			base_backoff_ms: 1,
			max_backoff_ms: 8,
			queue_capacity: 16,
		},
	}
}

fn llm_provider(base_url: &str, api_key: &str) -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "test-llm".to_string(),
		api_base: base_url.to_string(),
		api_key: api_key.to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "vision-test".to_string(),
		temperature: 0.0,
		timeout_ms: 2_000,
		default_headers: Map::new(),
	}
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub path: String,
	pub authorization: Option<String>,
	pub body: Value,
}

struct UpstreamState {
	replies: Mutex<VecDeque<(StatusCode, Value)>>,
	requests: Mutex<Vec<RecordedRequest>>,
}

/// Loopback HTTP server that answers every request with the next scripted reply and records
/// what it received. Unscripted requests get a 500.
pub struct MockUpstream {
	base_url: String,
	state: Arc<UpstreamState>,
	handle: JoinHandle<()>,
}
impl MockUpstream {
	pub async fn start(replies: Vec<(u16, Value)>) -> Result<Self> {
		let mut queue = VecDeque::with_capacity(replies.len());

		for (status, body) in replies {
			let status = StatusCode::from_u16(status)
				.map_err(|err| Error::Message(format!("Invalid scripted status {status}: {err}.")))?;

			queue.push_back((status, body));
		}

		let state = Arc::new(UpstreamState {
			replies: Mutex::new(queue),
			requests: Mutex::new(Vec::new()),
		});
		let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
		let addr = listener.local_addr()?;
		let app = Router::new().fallback(reply).with_state(state.clone());
		let handle = tokio::spawn(async move {
			let _ = axum::serve(listener, app).await;
		});

		Ok(Self { base_url: format!("http://{addr}"), state, handle })
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl Drop for MockUpstream {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

async fn reply(
	State(state): State<Arc<UpstreamState>>,
	uri: Uri,
	headers: HeaderMap,
	body: Bytes,
) -> Response {
	let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
	let authorization =
		headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);

	state.requests.lock().unwrap_or_else(|err| err.into_inner()).push(RecordedRequest {
		path: uri.path().to_string(),
		authorization,
		body,
	});

	let next = state.replies.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

	match next {
		Some((status, body)) => (status, axum::Json(body)).into_response(),
		None => (StatusCode::INTERNAL_SERVER_ERROR, "No scripted reply left.").into_response(),
	}
}
