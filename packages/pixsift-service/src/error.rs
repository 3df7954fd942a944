pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures a search caller can see. Each one renders as a single user-facing message.
///
/// Verification failures are absorbed by the verifier and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	InvalidQuery { message: String },
	#[error("Search failed: {message}")]
	Retrieval { message: String },
}
