use unicode_normalization::UnicodeNormalization;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryRejectReason {
	Empty,
	TooLong { max_chars: u32 },
}
impl QueryRejectReason {
	/// User-facing wording.
	pub fn message(self) -> String {
		match self {
			Self::Empty => "Please enter a search query.".to_string(),
			Self::TooLong { max_chars } =>
				format!("Search query must be at most {max_chars} characters."),
		}
	}
}

/// NFKC-normalizes the query and collapses runs of whitespace.
pub fn normalize_query(raw: &str, max_chars: u32) -> Result<String, QueryRejectReason> {
	let normalized: String = raw.nfkc().collect();
	let query = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

	if query.is_empty() {
		return Err(QueryRejectReason::Empty);
	}
	if query.chars().count() > max_chars as usize {
		return Err(QueryRejectReason::TooLong { max_chars });
	}

	Ok(query)
}
