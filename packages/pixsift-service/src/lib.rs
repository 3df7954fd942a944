pub mod debug;
pub mod ingest;
pub mod search;
pub mod verify;

mod error;

pub use debug::{DebugCandidate, DebugSearchResponse};
pub use error::{Error, Result};
pub use ingest::IndexedImage;
pub use search::{Gate, RelevanceResult, SearchDiagnostics, SearchOutcome, SearchRequest};
pub use verify::{VerificationOutcome, Verifier};

use std::{future::Future, pin::Pin, sync::Arc};

use pixsift_config::{Config, LlmProviderConfig, SearchIndexConfig};
use pixsift_domain::{candidate::ImageDescriptor, verdict::Verdict};
use pixsift_providers::{
	caption, judge,
	search_index::{self, IndexDocument, IndexHit},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Search index holding one captioned document per image.
pub trait ImageIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a SearchIndexConfig,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, pixsift_providers::Result<Vec<IndexHit>>>;

	fn upsert<'a>(
		&'a self,
		cfg: &'a SearchIndexConfig,
		doc: &'a IndexDocument,
	) -> BoxFuture<'a, pixsift_providers::Result<()>>;
}

/// Vision model that judges a batch of images against a query in one call.
pub trait RelevanceJudge
where
	Self: Send + Sync,
{
	fn judge<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		query: &'a str,
		image_urls: &'a [String],
	) -> BoxFuture<'a, pixsift_providers::Result<Vec<Verdict>>>;
}

pub trait Captioner
where
	Self: Send + Sync,
{
	fn caption<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		image: &'a ImageDescriptor,
	) -> BoxFuture<'a, pixsift_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub index: Arc<dyn ImageIndex>,
	pub judge: Arc<dyn RelevanceJudge>,
	pub captioner: Arc<dyn Captioner>,
}
impl Providers {
	pub fn new(
		index: Arc<dyn ImageIndex>,
		judge: Arc<dyn RelevanceJudge>,
		captioner: Arc<dyn Captioner>,
	) -> Self {
		Self { index, judge, captioner }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(HttpProviders);

		Self { index: provider.clone(), judge: provider.clone(), captioner: provider }
	}
}

pub struct PixsiftService {
	pub cfg: Config,
	pub providers: Providers,
}
impl PixsiftService {
	pub fn new(cfg: Config) -> Self {
		Self { cfg, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers }
	}
}

/// Collaborators backed by the HTTP clients in `pixsift-providers`.
struct HttpProviders;
impl ImageIndex for HttpProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a SearchIndexConfig,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, pixsift_providers::Result<Vec<IndexHit>>> {
		Box::pin(search_index::search(cfg, query, limit))
	}

	fn upsert<'a>(
		&'a self,
		cfg: &'a SearchIndexConfig,
		doc: &'a IndexDocument,
	) -> BoxFuture<'a, pixsift_providers::Result<()>> {
		Box::pin(search_index::upsert(cfg, doc))
	}
}
impl RelevanceJudge for HttpProviders {
	fn judge<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		query: &'a str,
		image_urls: &'a [String],
	) -> BoxFuture<'a, pixsift_providers::Result<Vec<Verdict>>> {
		Box::pin(judge::judge(cfg, query, image_urls))
	}
}
impl Captioner for HttpProviders {
	fn caption<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		image: &'a ImageDescriptor,
	) -> BoxFuture<'a, pixsift_providers::Result<String>> {
		Box::pin(caption::caption(cfg, image))
	}
}
