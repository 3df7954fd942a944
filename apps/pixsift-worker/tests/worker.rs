use std::{
	collections::VecDeque,
	sync::{Arc, Mutex},
};

use pixsift_config::{LlmProviderConfig, SearchIndexConfig};
use pixsift_domain::{candidate::ImageDescriptor, verdict::Verdict};
use pixsift_providers::{
	Error as ProviderError,
	search_index::{IndexDocument, IndexHit},
};
use pixsift_service::{BoxFuture, Captioner, ImageIndex, PixsiftService, Providers, RelevanceJudge};
use pixsift_worker::{CaptionQueue, Error, worker};

type CaptionReply = Result<String, (u16, String)>;

struct ScriptedCaptioner {
	replies: Mutex<VecDeque<CaptionReply>>,
	calls: Mutex<usize>,
}
impl ScriptedCaptioner {
	fn new(replies: Vec<CaptionReply>) -> Self {
		Self { replies: Mutex::new(replies.into()), calls: Mutex::new(0) }
	}

	fn calls(&self) -> usize {
		*self.calls.lock().expect("Call counter poisoned.")
	}
}
impl Captioner for ScriptedCaptioner {
	fn caption<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_image: &'a ImageDescriptor,
	) -> BoxFuture<'a, pixsift_providers::Result<String>> {
		*self.calls.lock().expect("Call counter poisoned.") += 1;

		let reply = self
			.replies
			.lock()
			.expect("Reply script poisoned.")
			.pop_front()
			.unwrap_or_else(|| Ok("A default caption.".to_string()));
		let result = reply.map_err(|(status, body)| ProviderError::Status { status, body });

		Box::pin(async move { result })
	}
}

#[derive(Default)]
struct RecordingIndex {
	docs: Mutex<Vec<IndexDocument>>,
}
impl RecordingIndex {
	fn docs(&self) -> Vec<IndexDocument> {
		self.docs.lock().expect("Document log poisoned.").clone()
	}
}
impl ImageIndex for RecordingIndex {
	fn search<'a>(
		&'a self,
		_cfg: &'a SearchIndexConfig,
		_query: &'a str,
		_limit: u32,
	) -> BoxFuture<'a, pixsift_providers::Result<Vec<IndexHit>>> {
		Box::pin(async { Ok(Vec::new()) })
	}

	fn upsert<'a>(
		&'a self,
		_cfg: &'a SearchIndexConfig,
		doc: &'a IndexDocument,
	) -> BoxFuture<'a, pixsift_providers::Result<()>> {
		self.docs.lock().expect("Document log poisoned.").push(doc.clone());

		Box::pin(async { Ok(()) })
	}
}

struct UnusedJudge;
impl RelevanceJudge for UnusedJudge {
	fn judge<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_query: &'a str,
		_image_urls: &'a [String],
	) -> BoxFuture<'a, pixsift_providers::Result<Vec<Verdict>>> {
		Box::pin(async { Ok(Vec::new()) })
	}
}

fn image(name: &str) -> ImageDescriptor {
	serde_json::from_value(serde_json::json!({ "url": format!("https://blob.test/{name}.png") }))
		.expect("Descriptor must parse.")
}

fn service(captioner: Arc<ScriptedCaptioner>) -> (Arc<PixsiftService>, Arc<RecordingIndex>) {
	let index = Arc::new(RecordingIndex::default());
	let providers = Providers::new(index.clone(), Arc::new(UnusedJudge), captioner);
	let cfg = pixsift_testkit::test_config("http://127.0.0.1:9");

	(Arc::new(PixsiftService::with_providers(cfg, providers)), index)
}

#[tokio::test]
async fn rate_limited_caption_is_retried() {
	let captioner = Arc::new(ScriptedCaptioner::new(vec![
		Err((429, "rate limit exceeded".to_string())),
		Ok("Man in a blue t-shirt.".to_string()),
	]));
	let (service, index) = service(captioner.clone());
	let job = pixsift_worker::CaptionJob::new(image("a"));
	let indexed = worker::process_job(&service, &job).await.expect("Job failed.");

	assert_eq!(captioner.calls(), 2);
	assert_eq!(indexed.description, "Man in a blue t-shirt.");
	assert_eq!(index.docs().len(), 1);
}

#[tokio::test]
async fn invalid_image_is_not_retried() {
	let captioner =
		Arc::new(ScriptedCaptioner::new(vec![Err((400, "unsupported image format".to_string()))]));
	let (service, index) = service(captioner.clone());
	let job = pixsift_worker::CaptionJob::new(image("a"));
	let err = worker::process_job(&service, &job).await.expect_err("Expected a fatal error.");

	assert!(matches!(err, Error::Fatal { .. }), "Unexpected error: {err}");
	assert_eq!(captioner.calls(), 1);
	assert!(index.docs().is_empty());
}

#[tokio::test]
async fn transient_failures_exhaust_the_attempt_budget() {
	let failures = (0..10).map(|_| Err((503, "upstream overloaded".to_string()))).collect();
	let captioner = Arc::new(ScriptedCaptioner::new(failures));
	let (service, _) = service(captioner.clone());
	let job = pixsift_worker::CaptionJob::new(image("a"));
	let err = worker::process_job(&service, &job).await.expect_err("Expected a fatal error.");

	assert!(matches!(err, Error::Fatal { .. }), "Unexpected error: {err}");
	assert_eq!(captioner.calls() as u32, service.cfg.captioning.max_attempts);
}

#[tokio::test]
async fn backfill_counts_indexed_and_failed_images() {
	let captioner = Arc::new(ScriptedCaptioner::new(vec![
		Ok("First.".to_string()),
		Err((422, "invalid image".to_string())),
		Ok("Third.".to_string()),
	]));
	let (service, index) = service(captioner);
	let report = worker::backfill(&service, vec![image("a"), image("b"), image("c")]).await;

	assert_eq!(report.indexed, 2);
	assert_eq!(report.failed, 1);
	assert_eq!(
		index.docs().iter().map(|doc| doc.content.description.as_str()).collect::<Vec<_>>(),
		vec!["First.", "Third."]
	);
}

#[tokio::test]
async fn queue_drains_before_shutdown() {
	let captioner = Arc::new(ScriptedCaptioner::new(Vec::new()));
	let (service, index) = service(captioner);
	let (queue, handle) = worker::spawn_queue(service);

	queue.enqueue(image("a")).expect("Enqueue failed.");
	queue.enqueue(image("b")).expect("Enqueue failed.");

	drop(queue);
	handle.await.expect("Queue task panicked.");

	assert_eq!(index.docs().len(), 2);
}

#[test]
fn full_queue_rejects_new_jobs() {
	let (queue, _receiver) = CaptionQueue::bounded(1);

	queue.enqueue(image("a")).expect("Enqueue failed.");

	let err = queue.enqueue(image("b")).expect_err("Expected a full queue.");

	assert!(matches!(err, Error::QueueFull { capacity: 1 }), "Unexpected error: {err}");
}

#[test]
fn closed_queue_rejects_new_jobs() {
	let (queue, receiver) = CaptionQueue::bounded(4);

	drop(receiver);

	assert!(matches!(queue.enqueue(image("a")), Err(Error::QueueClosed)));
}

#[test]
fn manifest_is_a_json_array_of_descriptors() {
	let path = std::env::temp_dir().join(format!("pixsift-manifest-{}.json", std::process::id()));

	std::fs::write(
		&path,
		r#"[{ "url": "https://blob.test/a.png", "pathname": "a.png" }, { "url": "https://blob.test/b.png" }]"#,
	)
	.expect("Failed to write manifest.");

	let images = pixsift_worker::read_manifest(&path).expect("Manifest must parse.");

	std::fs::remove_file(&path).expect("Failed to remove manifest.");

	assert_eq!(images.len(), 2);
	assert_eq!(images[0].pathname.as_deref(), Some("a.png"));
}
