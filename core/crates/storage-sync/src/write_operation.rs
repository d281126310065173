use crate::ValidationError;

use ms_storage_model::{Manifest, StorageId, StorageRecord};

use std::{collections::HashSet, fmt};

/// Everything one write to the storage service consists of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOperationResult {
	pub manifest: Manifest,
	pub inserts: Vec<StorageRecord>,
	/// Raw ids of records to remove remotely
	pub deletes: Vec<Vec<u8>>,
}

impl WriteOperationResult {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.inserts.is_empty() && self.deletes.is_empty()
	}
}

impl fmt::Display for WriteOperationResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_empty() {
			return write!(f, "Empty");
		}

		write!(
			f,
			"<manifest_version={}, total_keys={}, inserts={}, deletes={}>",
			self.manifest.version,
			self.manifest.ids.len(),
			self.inserts.len(),
			self.deletes.len()
		)
	}
}

/// Version of the manifest following `previous`, failing when the counter is exhausted
pub fn next_manifest_version(previous: &Manifest) -> Result<u64, ValidationError> {
	previous
		.version
		.checked_add(1)
		.ok_or(ValidationError::IncorrectManifestVersion {
			previous: previous.version,
			new: previous.version.wrapping_add(1),
		})
}

/// Builds the write that replaces `previous` with the local state.
///
/// `local_ids` is the complete new id set, `local_records` the records local state has;
/// only those unknown to `previous` are uploaded.
pub fn create_write_operation(
	previous: &Manifest,
	local_ids: Vec<StorageId>,
	local_records: Vec<StorageRecord>,
) -> Result<WriteOperationResult, ValidationError> {
	let version = next_manifest_version(previous)?;
	let previous_ids = previous.raw_ids();
	let local_raw = local_ids.iter().map(StorageId::raw).collect::<HashSet<_>>();

	let deletes = previous
		.ids
		.iter()
		.map(StorageId::raw)
		.filter(|raw| !local_raw.contains(raw))
		.map(<[u8]>::to_vec)
		.collect();

	let inserts = local_records
		.into_iter()
		.filter(|record| !previous_ids.contains(record.id.raw()))
		.collect();

	Ok(WriteOperationResult {
		manifest: Manifest::new(version, local_ids),
		inserts,
		deletes,
	})
}
