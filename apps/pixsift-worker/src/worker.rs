use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::{
	sync::mpsc::{self, error::TrySendError},
	task::JoinHandle,
	time as tokio_time,
};
use uuid::Uuid;

use pixsift_config::Captioning;
use pixsift_domain::{
	caption::{self, RetryDecision},
	candidate::ImageDescriptor,
};
use pixsift_service::{IndexedImage, PixsiftService};

use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct CaptionJob {
	pub job_id: Uuid,
	pub image: ImageDescriptor,
	pub enqueued_at: OffsetDateTime,
}
impl CaptionJob {
	pub fn new(image: ImageDescriptor) -> Self {
		Self { job_id: Uuid::new_v4(), image, enqueued_at: OffsetDateTime::now_utc() }
	}
}

/// Producer side of the in-process caption queue.
#[derive(Clone, Debug)]
pub struct CaptionQueue {
	sender: mpsc::Sender<CaptionJob>,
}
impl CaptionQueue {
	/// A queue and its receiving end. Pass the receiver to [`run_queue`].
	pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<CaptionJob>) {
		let (sender, receiver) = mpsc::channel(capacity.max(1));

		(Self { sender }, receiver)
	}

	/// Queues an image without waiting. Fails when the queue is full or its consumer is gone.
	pub fn enqueue(&self, image: ImageDescriptor) -> Result<Uuid> {
		let job = CaptionJob::new(image);
		let job_id = job.job_id;

		self.sender.try_send(job).map_err(|err| match err {
			TrySendError::Full(_) => Error::QueueFull { capacity: self.sender.max_capacity() },
			TrySendError::Closed(_) => Error::QueueClosed,
		})?;

		tracing::info!(%job_id, "Caption job queued.");

		Ok(job_id)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
	pub indexed: usize,
	pub failed: usize,
}

/// Starts a consumer on the current runtime. It exits once every `CaptionQueue` clone is dropped.
pub fn spawn_queue(service: Arc<PixsiftService>) -> (CaptionQueue, JoinHandle<()>) {
	let (queue, receiver) = CaptionQueue::bounded(service.cfg.captioning.queue_capacity as usize);
	let handle = tokio::spawn(run_queue(service, receiver));

	(queue, handle)
}

/// Processes jobs one at a time so retries back off the shared captioning quota.
pub async fn run_queue(service: Arc<PixsiftService>, mut receiver: mpsc::Receiver<CaptionJob>) {
	while let Some(job) = receiver.recv().await {
		let queued_ms = (OffsetDateTime::now_utc() - job.enqueued_at).whole_milliseconds() as i64;

		tracing::debug!(job_id = %job.job_id, queued_ms, "Caption job dequeued.");

		if let Err(err) = process_job(&service, &job).await {
			tracing::error!(job_id = %job.job_id, error = %err, "Caption job failed.");
		}
	}

	tracing::info!("Caption queue closed.");
}

/// Captions and indexes every image in order, each to completion.
pub async fn backfill(service: &PixsiftService, images: Vec<ImageDescriptor>) -> BackfillReport {
	let mut report = BackfillReport::default();

	for image in images {
		let job = CaptionJob::new(image);

		match process_job(service, &job).await {
			Ok(_) => report.indexed += 1,
			Err(err) => {
				tracing::error!(
					job_id = %job.job_id,
					url = job.image.url.as_str(),
					error = %err,
					"Backfill job failed."
				);

				report.failed += 1;
			},
		}
	}

	report
}

/// Runs attempts until one succeeds or the retry policy gives up. The returned error is always
/// `Error::Fatal`.
pub async fn process_job(service: &PixsiftService, job: &CaptionJob) -> Result<IndexedImage> {
	let mut attempt = 1;

	loop {
		match attempt_once(service, job, attempt).await {
			Ok(indexed) => {
				tracing::info!(
					job_id = %job.job_id,
					attempt,
					document_id = indexed.document_id.as_str(),
					"Caption job completed."
				);

				return Ok(indexed);
			},
			Err(Error::Retryable { message, retry_after }) => {
				tracing::warn!(
					job_id = %job.job_id,
					attempt,
					retry_after_ms = retry_after.as_millis() as u64,
					error = message.as_str(),
					"Caption attempt failed. Retrying."
				);
				tokio_time::sleep(retry_after).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

async fn attempt_once(
	service: &PixsiftService,
	job: &CaptionJob,
	attempt: u32,
) -> Result<IndexedImage> {
	service
		.index_image(&job.image)
		.await
		.map_err(|err| failure_for(&service.cfg.captioning, &err, attempt))
}

fn failure_for(cfg: &Captioning, err: &pixsift_providers::Error, attempt: u32) -> Error {
	let message = err.to_string();
	let kind = caption::classify(err.status(), &message);

	match caption::retry_decision(cfg, kind, attempt) {
		RetryDecision::RetryAfter(retry_after) => Error::Retryable { message, retry_after },
		RetryDecision::GiveUp => Error::Fatal {
			message: format!("Gave up after {attempt} attempt(s) ({kind:?}): {message}"),
		},
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	fn captioning() -> Captioning {
		Captioning {
			max_attempts: 3,
			rate_limit_retry_after_ms: 300_000,
			base_backoff_ms: 500,
			max_backoff_ms: 30_000,
			queue_capacity: 8,
		}
	}

	fn status(status: u16, body: &str) -> pixsift_providers::Error {
		pixsift_providers::Error::Status { status, body: body.to_string() }
	}

	#[test]
	fn rate_limits_wait_the_long_pause() {
		let err = failure_for(&captioning(), &status(429, "slow down"), 1);

		assert!(matches!(
			err,
			Error::Retryable { retry_after, .. } if retry_after == Duration::from_millis(300_000)
		));
	}

	#[test]
	fn invalid_images_fail_immediately() {
		let err = failure_for(&captioning(), &status(400, "invalid image"), 1);

		assert!(matches!(err, Error::Fatal { .. }));
	}

	#[test]
	fn transient_failures_stop_at_the_attempt_budget() {
		let err = pixsift_providers::Error::InvalidResponse { message: "timed out".to_string() };

		assert!(matches!(
			failure_for(&captioning(), &err, 2),
			Error::Retryable { retry_after, .. } if retry_after == Duration::from_millis(1_000)
		));
		assert!(matches!(failure_for(&captioning(), &err, 3), Error::Fatal { .. }));
	}
}
