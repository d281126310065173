use crate::ValidationError;

use ms_core_account_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("storage sync invariant violated: {0}")]
	Invariant(#[from] ValidationError),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Encoding(#[from] ms_storage_model::Error),
	#[error("account records are never inserted, the local account always exists")]
	AccountInsert,
}

impl Error {
	/// Invariant violations mean the engine produced an inconsistent result and must not
	/// be retried as is; every other error aborts the pass and can be retried later
	#[must_use]
	pub const fn is_invariant_violation(&self) -> bool {
		matches!(self, Self::Invariant(_))
	}
}
