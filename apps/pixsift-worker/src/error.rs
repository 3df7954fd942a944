use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The attempt failed but the job may run again after `retry_after`.
	#[error("{message}")]
	Retryable { message: String, retry_after: Duration },
	/// The job will not be attempted again.
	#[error("{message}")]
	Fatal { message: String },
	#[error("Caption queue is full ({capacity} jobs pending).")]
	QueueFull { capacity: usize },
	#[error("Caption queue is closed.")]
	QueueClosed,
	#[error(transparent)]
	Config(#[from] pixsift_config::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
}
