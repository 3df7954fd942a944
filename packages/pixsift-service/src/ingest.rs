use serde::Serialize;

use pixsift_domain::candidate::ImageDescriptor;
use pixsift_providers::search_index::IndexDocument;

use crate::PixsiftService;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexedImage {
	pub document_id: String,
	pub description: String,
}

impl PixsiftService {
	/// Captions one image and upserts it into the search index. A single attempt; callers own
	/// retries.
	pub async fn index_image(
		&self,
		image: &ImageDescriptor,
	) -> pixsift_providers::Result<IndexedImage> {
		let description =
			self.providers.captioner.caption(&self.cfg.providers.captioner, image).await?;
		let doc = IndexDocument::for_image(image.clone(), description);

		self.providers.index.upsert(&self.cfg.providers.search_index, &doc).await?;

		tracing::info!(
			document_id = doc.id.as_str(),
			description_chars = doc.content.description.chars().count(),
			"Image indexed."
		);

		Ok(IndexedImage { document_id: doc.id, description: doc.content.description })
	}
}
