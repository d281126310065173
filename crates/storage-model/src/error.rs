#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to encode record payload: {0}")]
	Encode(#[from] rmp_serde::encode::Error),
	#[error("failed to decode record payload: {0}")]
	Decode(#[from] rmp_serde::decode::Error),
	#[error("invalid {what} length: <expected={expected}, got={got}>")]
	InvalidLength {
		what: &'static str,
		expected: usize,
		got: usize,
	},
}
