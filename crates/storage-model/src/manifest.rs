use crate::{RecordKind, StorageId};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The full set of record ids on the storage service at a given version.
///
/// Order of `ids` carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
	pub version: u64,
	pub ids: Vec<StorageId>,
}

impl Manifest {
	#[must_use]
	pub const fn new(version: u64, ids: Vec<StorageId>) -> Self {
		Self { version, ids }
	}

	pub fn ids_of_kind(&self, kind: RecordKind) -> impl Iterator<Item = &StorageId> {
		self.ids.iter().filter(move |id| id.kind == kind)
	}

	#[must_use]
	pub fn raw_ids(&self) -> HashSet<&[u8]> {
		self.ids.iter().map(StorageId::raw).collect()
	}

	#[must_use]
	pub fn contains_raw(&self, raw: &[u8]) -> bool {
		self.ids.iter().any(|id| id.raw() == raw)
	}
}
