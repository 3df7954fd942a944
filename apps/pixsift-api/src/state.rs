use std::sync::Arc;

use pixsift_config::Config;
use pixsift_service::PixsiftService;
use pixsift_worker::{CaptionQueue, worker};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PixsiftService>,
	pub captions: CaptionQueue,
}
impl AppState {
	/// Builds the HTTP-backed service. Must run inside a Tokio runtime.
	pub fn new(config: Config) -> Self {
		Self::with_service(Arc::new(PixsiftService::new(config)))
	}

	/// Starts the caption consumer for `service`. It stops when the last state clone is dropped.
	pub fn with_service(service: Arc<PixsiftService>) -> Self {
		let (captions, _consumer) = worker::spawn_queue(service.clone());

		Self { service, captions }
	}
}
