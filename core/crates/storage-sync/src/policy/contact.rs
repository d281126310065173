use crate::{
	models::local_contact_record, Error, Job, MergePolicy, PassContext, RecordUpdate,
};

use ms_core_account_store::{Contact, IdentityKey, Profile, ProfileKey, TrustLevel};
use ms_storage_model::{Aci, ContactRecord, Pni, RecipientAddress, Record};
use ms_utils::first_non_empty;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace, warn};

static E164: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{0,18}$").ok());

fn is_valid_e164(number: &str) -> bool {
	E164.as_ref().is_some_and(|pattern| pattern.is_match(number))
}

fn address_of(fields: &ContactRecord) -> RecipientAddress {
	RecipientAddress::from_parts(fields.aci, fields.pni, &fields.e164, &fields.username)
}

/// A contact is known by any of its identifiers, sharing one makes two contacts the same
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContactKey {
	Aci(Aci),
	E164(String),
	Pni(Pni),
}

#[derive(Debug, Default)]
pub struct ContactPolicy;

#[async_trait]
impl MergePolicy for ContactPolicy {
	type Fields = ContactRecord;
	type Key = ContactKey;

	async fn is_invalid(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<ContactRecord>,
	) -> Result<bool, Error> {
		let fields = &remote.fields;

		if fields.valid_aci().is_none() && fields.valid_pni().is_none() {
			debug!("Contact record has neither an aci nor a pni");
			return Ok(true);
		}

		if ctx.self_address.matches(&address_of(fields)) {
			debug!("Contact record points at ourselves");
			return Ok(true);
		}

		if !fields.e164.is_empty() && !is_valid_e164(&fields.e164) {
			debug!(e164 = %fields.e164, "Contact record has an invalid e164");
			return Ok(true);
		}

		Ok(false)
	}

	async fn get_matching(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<ContactRecord>,
	) -> Result<Option<Record<ContactRecord>>, Error> {
		let recipient_id = ctx.tx.resolve_recipient(&address_of(&remote.fields)).await?;
		local_contact_record(&mut *ctx.tx, recipient_id).await
	}

	fn merge(
		&self,
		ctx: &PassContext<'_>,
		remote: &Record<ContactRecord>,
		local: &Record<ContactRecord>,
	) -> ContactRecord {
		let (remote, local) = (&remote.fields, &local.fields);
		let primary = ctx.is_primary_device();

		let profile_names = if remote.given_name.is_empty() && remote.family_name.is_empty() {
			local
		} else {
			remote
		};

		let identity = if !remote.identity_key.is_empty()
			&& (!primary
				|| remote.identity_state != local.identity_state
				|| local.identity_key.is_empty())
		{
			remote
		} else {
			local
		};

		if local.valid_aci().is_some()
			&& !local.identity_key.is_empty()
			&& !remote.identity_key.is_empty()
			&& local.identity_key != remote.identity_key
		{
			debug!("Local and remote identity keys differ, fetching the profile");
			ctx.enqueue(Job::DownloadProfile {
				address: address_of(local),
			});
		}

		let (local_pni, remote_pni) = (local.valid_pni(), remote.valid_pni());
		let e164s_match_but_pnis_dont = !local.e164.is_empty()
			&& local.e164 == remote.e164
			&& local_pni.is_some()
			&& remote_pni.is_some()
			&& local_pni != remote_pni;
		let pnis_match_but_e164s_dont = local_pni.is_some()
			&& local_pni == remote_pni
			&& !local.e164.is_empty()
			&& !remote.e164.is_empty()
			&& local.e164 != remote.e164;

		let (pni, e164) = if !primary && (e164s_match_but_pnis_dont || pnis_match_but_e164s_dont)
		{
			debug!(
				e164s_match_but_pnis_dont,
				pnis_match_but_e164s_dont, "Contact identifiers disagree, trusting our local pair"
			);
			ctx.enqueue(Job::RefreshRecipients);
			(local_pni, local.e164.clone())
		} else {
			(
				remote_pni.or(local_pni),
				first_non_empty(&remote.e164, &local.e164),
			)
		};

		// System contact fields belong to the primary device's address book
		let system = if primary { local } else { remote };

		ContactRecord {
			aci: local.valid_aci().or_else(|| remote.valid_aci()),
			pni,
			e164,
			username: first_non_empty(&remote.username, &local.username),
			profile_key: first_non_empty(&remote.profile_key, &local.profile_key),
			identity_key: identity.identity_key.clone(),
			identity_state: identity.identity_state,
			given_name: profile_names.given_name.clone(),
			family_name: profile_names.family_name.clone(),
			system_given_name: system.system_given_name.clone(),
			system_family_name: system.system_family_name.clone(),
			system_nickname: remote.system_nickname.clone(),
			blocked: remote.blocked,
			whitelisted: remote.whitelisted,
			archived: remote.archived,
			marked_unread: remote.marked_unread,
			mute_until: remote.mute_until,
			hide_story: remote.hide_story,
			unregistered_at: remote.unregistered_at,
			hidden: remote.hidden,
			pni_signature_verified: remote.pni_signature_verified || local.pni_signature_verified,
			nickname: remote.nickname.clone(),
			note: remote.note.clone(),
			unknown_fields: remote.unknown_fields.clone(),
		}
	}

	async fn insert_local(
		&self,
		ctx: &mut PassContext<'_>,
		remote: Record<ContactRecord>,
	) -> Result<(), Error> {
		store_contact_record(ctx, remote).await
	}

	async fn update_local(
		&self,
		ctx: &mut PassContext<'_>,
		update: RecordUpdate<ContactRecord>,
	) -> Result<(), Error> {
		store_contact_record(ctx, update.new).await
	}

	fn equivalence_keys(&self, record: &Record<ContactRecord>) -> Vec<ContactKey> {
		let fields = &record.fields;

		[
			fields.valid_aci().map(ContactKey::Aci),
			(!fields.e164.is_empty()).then(|| ContactKey::E164(fields.e164.clone())),
			fields.valid_pni().map(ContactKey::Pni),
		]
		.into_iter()
		.flatten()
		.collect()
	}
}

async fn store_contact_record(
	ctx: &mut PassContext<'_>,
	record: Record<ContactRecord>,
) -> Result<(), Error> {
	let fields = &record.fields;
	let address = address_of(fields);
	let recipient_id = ctx.tx.resolve_recipient_trusted(&address).await?;
	let recipient = ctx.tx.recipient(recipient_id).await?;
	let (existing_contact, existing_profile) = recipient
		.map(|recipient| (recipient.contact, recipient.profile))
		.unwrap_or_default();

	let contact = Contact {
		given_name: fields.system_given_name.clone(),
		family_name: fields.system_family_name.clone(),
		nickname: fields.system_nickname.clone(),
		nickname_given_name: fields.nickname.given.clone(),
		nickname_family_name: fields.nickname.family.clone(),
		note: fields.note.clone(),
		mute_until: fields.mute_until,
		hide_story: fields.hide_story,
		blocked: fields.blocked,
		archived: fields.archived,
		profile_sharing: fields.whitelisted,
		hidden: fields.hidden,
		unregistered_at: (fields.unregistered_at != 0).then_some(fields.unregistered_at),
	};
	if existing_contact.unwrap_or_default() != contact {
		debug!(%recipient_id, "Storing new or updated contact");
		ctx.tx.store_contact(recipient_id, contact).await?;
	}

	let existing_profile = existing_profile.unwrap_or_default();
	if existing_profile.given_name != fields.given_name
		|| existing_profile.family_name != fields.family_name
	{
		ctx.tx
			.store_profile(
				recipient_id,
				Profile {
					given_name: fields.given_name.clone(),
					family_name: fields.family_name.clone(),
					..existing_profile
				},
			)
			.await?;
	}

	if !fields.profile_key.is_empty() {
		match ProfileKey::parse(&fields.profile_key) {
			Some(profile_key) => {
				trace!(%recipient_id, "Storing profile key");
				ctx.tx.store_profile_key(recipient_id, profile_key).await?;
			}
			None => warn!(%recipient_id, "Received invalid contact profile key from storage"),
		}
	}

	if !fields.identity_key.is_empty() && address.aci.is_some() {
		match IdentityKey::parse(&fields.identity_key) {
			Some(identity_key) => {
				trace!(%recipient_id, "Storing identity key");
				ctx.tx.save_identity(recipient_id, identity_key.clone()).await?;
				ctx.tx
					.set_identity_trust_level(
						recipient_id,
						&identity_key,
						TrustLevel::from(fields.identity_state),
					)
					.await?;
			}
			None => warn!(%recipient_id, "Received invalid contact identity key from storage"),
		}
	}

	ctx.tx
		.store_storage_record(recipient_id, record.id.clone(), record.encode()?)
		.await?;

	Ok(())
}
