//! Local state exported as storage records.
//!
//! Each projection starts from the last record stored for the entity, so fields this
//! client doesn't model locally (unknown fields included) survive, and overlays what the
//! local stores know.

use crate::Error;

use ms_core_account_store::{
	AccountTransaction, Contact, GroupInfoV1, GroupInfoV2, RecipientId, StoreError,
};
use ms_storage_model::{
	AccountRecord, ContactRecord, GroupV1Record, GroupV2Record, IdentityState, Name, Record,
	RecordFields, RecordKind, StorageId,
};

use tracing::warn;

fn base<T: RecordFields + Default>(stored: Option<&[u8]>) -> T {
	stored.map_or_else(T::default, |bytes| {
		T::decode(bytes).unwrap_or_else(|e| {
			warn!(?e, "Stored storage record is unreadable, starting from an empty one");
			T::default()
		})
	})
}

pub async fn local_account_record(
	tx: &mut dyn AccountTransaction,
) -> Result<Record<AccountRecord>, Error> {
	let self_id = tx.self_recipient_id().await?;
	let storage_id = tx.storage_id(self_id, RecordKind::Account).await?;
	let recipient = tx
		.recipient(self_id)
		.await?
		.ok_or(StoreError::RecipientNotFound(self_id))?;
	let settings = tx.settings().await?;

	let mut fields = base::<AccountRecord>(recipient.storage_record.as_deref());

	if let Some(profile) = &recipient.profile {
		fields.given_name.clone_from(&profile.given_name);
		fields.family_name.clone_from(&profile.family_name);
		fields.avatar_url_path.clone_from(&profile.avatar_url_path);
	}
	if let Some(profile_key) = &recipient.profile_key {
		fields.profile_key = profile_key.as_bytes().to_vec();
	}
	if let Some(number) = &recipient.address.number {
		fields.e164.clone_from(number);
	}

	if let Some(value) = settings.read_receipts {
		fields.read_receipts = value;
	}
	if let Some(value) = settings.typing_indicators {
		fields.typing_indicators = value;
	}
	if let Some(value) = settings.sealed_sender_indicators {
		fields.sealed_sender_indicators = value;
	}
	if let Some(value) = settings.link_previews {
		fields.link_previews = value;
	}
	if let Some(mode) = settings.phone_number_sharing_mode {
		fields.phone_number_sharing_mode = mode;
	}
	if let Some(value) = settings.unlisted_phone_number {
		fields.unlisted_phone_number = value;
	}

	fields.username = tx.username().await?.unwrap_or_default();
	fields.username_link = tx.username_link().await?;

	Ok(Record::new(storage_id, fields))
}

fn overlay_contact(fields: &mut ContactRecord, contact: &Contact) {
	fields.system_given_name.clone_from(&contact.given_name);
	fields.system_family_name.clone_from(&contact.family_name);
	fields.system_nickname.clone_from(&contact.nickname);
	fields.nickname = Name {
		given: contact.nickname_given_name.clone(),
		family: contact.nickname_family_name.clone(),
	};
	fields.note.clone_from(&contact.note);
	fields.blocked = contact.blocked;
	fields.whitelisted = contact.profile_sharing;
	fields.archived = contact.archived;
	fields.mute_until = contact.mute_until;
	fields.hide_story = contact.hide_story;
	fields.hidden = contact.hidden;
	fields.unregistered_at = contact.unregistered_at.unwrap_or_default();
}

/// Contact projection of a recipient, `None` if the recipient doesn't exist
pub async fn local_contact_record(
	tx: &mut dyn AccountTransaction,
	recipient_id: RecipientId,
) -> Result<Option<Record<ContactRecord>>, Error> {
	let Some(recipient) = tx.recipient(recipient_id).await? else {
		return Ok(None);
	};
	let storage_id = tx.storage_id(recipient_id, RecordKind::Contact).await?;

	let mut fields = base::<ContactRecord>(recipient.storage_record.as_deref());

	let address = &recipient.address;
	fields.aci = address.aci;
	fields.pni = address.pni;
	fields.e164 = address.number.clone().unwrap_or_default();
	fields.username = address.username.clone().unwrap_or_default();

	if let Some(profile_key) = &recipient.profile_key {
		fields.profile_key = profile_key.as_bytes().to_vec();
	}
	if let Some(profile) = &recipient.profile {
		fields.given_name.clone_from(&profile.given_name);
		fields.family_name.clone_from(&profile.family_name);
	}
	if let Some(contact) = &recipient.contact {
		overlay_contact(&mut fields, contact);
	}
	if let Some(identity) = tx.identity(recipient_id).await? {
		fields.identity_key = identity.key.as_bytes().to_vec();
		fields.identity_state = IdentityState::from(identity.trust_level);
	}

	Ok(Some(Record::new(storage_id, fields)))
}

#[must_use]
pub fn local_group_v1_record(group: &GroupInfoV1, storage_id: StorageId) -> Record<GroupV1Record> {
	let mut fields = base::<GroupV1Record>(group.storage_record.as_deref());
	fields.id = group.id.as_bytes().to_vec();
	fields.blocked = group.blocked;
	fields.whitelisted = group.profile_sharing;
	fields.archived = group.archived;

	Record::new(storage_id, fields)
}

#[must_use]
pub fn local_group_v2_record(group: &GroupInfoV2, storage_id: StorageId) -> Record<GroupV2Record> {
	let mut fields = base::<GroupV2Record>(group.storage_record.as_deref());
	fields.master_key = group.master_key.as_bytes().to_vec();
	fields.blocked = group.blocked;
	fields.whitelisted = group.profile_sharing;

	Record::new(storage_id, fields)
}
