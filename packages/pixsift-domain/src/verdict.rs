use serde::{Deserialize, Serialize};

/// Judge decision for one submitted image, keyed by its position in the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
	pub index: usize,
	pub relevant: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerdictError {
	#[error("Verdict index {index} is outside the submitted range 0..{expected}.")]
	OutOfRange { index: usize, expected: usize },
	#[error("Verdict index {index} appears more than once.")]
	Duplicate { index: usize },
	#[error("Verdict for index {index} is missing.")]
	Missing { index: usize },
}

/// Checks that `verdicts` name every index in `0..expected` exactly once and returns the
/// relevance flags in index order.
pub fn validate(verdicts: &[Verdict], expected: usize) -> Result<Vec<bool>, VerdictError> {
	let mut flags: Vec<Option<bool>> = vec![None; expected];

	for verdict in verdicts {
		let Some(slot) = flags.get_mut(verdict.index) else {
			return Err(VerdictError::OutOfRange { index: verdict.index, expected });
		};

		if slot.is_some() {
			return Err(VerdictError::Duplicate { index: verdict.index });
		}

		*slot = Some(verdict.relevant);
	}

	flags
		.into_iter()
		.enumerate()
		.map(|(index, flag)| flag.ok_or(VerdictError::Missing { index }))
		.collect()
}
