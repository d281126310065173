//! Invariants every write to the storage service must uphold.
//!
//! A violation means the engine itself produced an inconsistent result, so all of these
//! are fatal for the pass.

use crate::WriteOperationResult;

use ms_storage_model::{
	ContactRecord, Manifest, RecipientAddress, RecordKind, RecordPayload, StorageId,
	StorageRecord,
};

use std::collections::HashSet;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("manifest has no account record")]
	MissingAccount,
	#[error("manifest has more than one account record")]
	MultipleAccounts,
	#[error("manifest lists the same storage id twice")]
	DuplicateStorageId,
	#[error("raw id shared across kinds, involving contact records")]
	DuplicateContactId,
	#[error("raw id shared across kinds, involving group v1 records")]
	DuplicateGroupV1Id,
	#[error("raw id shared across kinds, involving group v2 records")]
	DuplicateGroupV2Id,
	#[error("raw id shared across kinds, involving distribution list records")]
	DuplicateDistributionListId,
	#[error("raw id shared across kinds, involving call link records")]
	DuplicateCallLinkId,
	#[error("raw id shared across kinds")]
	DuplicateRawIdAcrossKinds,
	#[error("write inserts the same record twice")]
	DuplicateInsertInWrite,
	#[error("inserted record is missing from the manifest")]
	InsertNotPresentInFullIdSet,
	#[error("write inserts a record of unknown kind")]
	UnknownInsert,
	#[error("write inserts a contact record for ourselves")]
	SelfAddedAsContact,
	#[error("deleted record is still in the manifest")]
	DeletePresentInFullIdSet,
	#[error("manifest version must follow the previous one: <previous={previous}, new={new}>")]
	IncorrectManifestVersion { previous: u64, new: u64 },
	#[error("more inserts than the manifest diff shows: <declared={declared}, expected={expected}>")]
	MoreInsertsThanExpected { declared: usize, expected: usize },
	#[error("less inserts than the manifest diff shows: <declared={declared}, expected={expected}>")]
	LessInsertsThanExpected { declared: usize, expected: usize },
	#[error("inserts don't match the manifest diff")]
	InsertMismatch,
	#[error("more deletes than the manifest diff shows: <declared={declared}, expected={expected}>")]
	MoreDeletesThanExpected { declared: usize, expected: usize },
	#[error("less deletes than the manifest diff shows: <declared={declared}, expected={expected}>")]
	LessDeletesThanExpected { declared: usize, expected: usize },
	#[error("deletes don't match the manifest diff")]
	DeleteMismatch,
}

/// Checks an incremental write against the manifest it is based on
pub fn validate(
	result: &WriteOperationResult,
	previous: &Manifest,
	force_push_pending: bool,
	self_address: &RecipientAddress,
) -> Result<(), ValidationError> {
	validate_manifest_and_inserts(&result.manifest, &result.inserts, self_address)?;

	let full_set = result.manifest.raw_ids();
	if result
		.deletes
		.iter()
		.any(|delete| full_set.contains(delete.as_slice()))
	{
		return Err(ValidationError::DeletePresentInFullIdSet);
	}

	if previous.version == 0 {
		debug!("Previous manifest is empty, skipping diff validation");
		return Ok(());
	}

	if previous.version.checked_add(1) != Some(result.manifest.version) {
		return Err(ValidationError::IncorrectManifestVersion {
			previous: previous.version,
			new: result.manifest.version,
		});
	}

	if force_push_pending {
		debug!("Force push pending, skipping diff validation");
		return Ok(());
	}

	let previous_ids = previous.raw_ids();
	let manifest_inserts = full_set
		.difference(&previous_ids)
		.copied()
		.collect::<HashSet<_>>();
	let manifest_deletes = previous_ids
		.difference(&full_set)
		.copied()
		.collect::<HashSet<_>>();

	let declared_inserts = result
		.inserts
		.iter()
		.map(|record| record.id.raw())
		.collect::<HashSet<_>>();
	let declared_deletes = result
		.deletes
		.iter()
		.map(Vec::as_slice)
		.collect::<HashSet<_>>();

	let (declared, expected) = (declared_inserts.len(), manifest_inserts.len());
	if declared > expected {
		return Err(ValidationError::MoreInsertsThanExpected { declared, expected });
	}
	if declared < expected {
		return Err(ValidationError::LessInsertsThanExpected { declared, expected });
	}
	if !manifest_inserts.is_subset(&declared_inserts) {
		return Err(ValidationError::InsertMismatch);
	}

	let (declared, expected) = (declared_deletes.len(), manifest_deletes.len());
	if declared > expected {
		return Err(ValidationError::MoreDeletesThanExpected { declared, expected });
	}
	if declared < expected {
		return Err(ValidationError::LessDeletesThanExpected { declared, expected });
	}
	if !manifest_deletes.is_subset(&declared_deletes) {
		return Err(ValidationError::DeleteMismatch);
	}

	Ok(())
}

/// Checks a full replacement of the remote state, where there is no diff to compare against
pub fn validate_force_push(
	manifest: &Manifest,
	inserts: &[StorageRecord],
	self_address: &RecipientAddress,
) -> Result<(), ValidationError> {
	validate_manifest_and_inserts(manifest, inserts, self_address)
}

fn validate_manifest_and_inserts(
	manifest: &Manifest,
	inserts: &[StorageRecord],
	self_address: &RecipientAddress,
) -> Result<(), ValidationError> {
	match manifest.ids_of_kind(RecordKind::Account).count() {
		0 => return Err(ValidationError::MissingAccount),
		1 => {}
		_ => return Err(ValidationError::MultipleAccounts),
	}

	let full_set = manifest.ids.iter().collect::<HashSet<_>>();
	if full_set.len() != manifest.ids.len() {
		return Err(ValidationError::DuplicateStorageId);
	}

	let raw_ids = manifest.raw_ids();
	if raw_ids.len() != full_set.len() {
		return Err(diagnose_raw_id_collision(manifest));
	}

	let insert_ids = inserts
		.iter()
		.map(|record| &record.id)
		.collect::<HashSet<_>>();
	if insert_ids.len() != inserts.len() {
		return Err(ValidationError::DuplicateInsertInWrite);
	}

	for insert in inserts {
		if !full_set.contains(&insert.id) {
			return Err(ValidationError::InsertNotPresentInFullIdSet);
		}

		match &insert.payload {
			RecordPayload::Unknown(_) => return Err(ValidationError::UnknownInsert),
			RecordPayload::Contact(contact) if is_self(contact, self_address) => {
				return Err(ValidationError::SelfAddedAsContact);
			}
			RecordPayload::Account(account) if account.profile_key.is_empty() => {
				debug!("Uploading an account record without a profile key");
			}
			_ => {}
		}
	}

	Ok(())
}

fn is_self(contact: &ContactRecord, self_address: &RecipientAddress) -> bool {
	self_address.matches(&RecipientAddress::from_parts(
		contact.aci,
		contact.pni,
		&contact.e164,
		&contact.username,
	))
}

/// Narrows a raw id collision down to the first kind involved in it
fn diagnose_raw_id_collision(manifest: &Manifest) -> ValidationError {
	let mut seen = HashSet::new();
	let colliding = manifest
		.ids
		.iter()
		.map(StorageId::raw)
		.filter(|raw| !seen.insert(*raw))
		.collect::<HashSet<_>>();

	let involved =
		|kind| manifest.ids_of_kind(kind).any(|id| colliding.contains(id.raw()));

	[
		(RecordKind::Contact, ValidationError::DuplicateContactId),
		(RecordKind::GroupV1, ValidationError::DuplicateGroupV1Id),
		(RecordKind::GroupV2, ValidationError::DuplicateGroupV2Id),
		(
			RecordKind::StoryDistributionList,
			ValidationError::DuplicateDistributionListId,
		),
		(RecordKind::CallLink, ValidationError::DuplicateCallLinkId),
	]
	.into_iter()
	.find_map(|(kind, error)| involved(kind).then_some(error))
	.unwrap_or(ValidationError::DuplicateRawIdAcrossKinds)
}
