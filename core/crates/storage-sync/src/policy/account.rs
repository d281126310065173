use crate::{
	models::local_account_record, Error, Job, MergePolicy, PassContext, RecordUpdate,
};

use ms_core_account_store::{Profile, ProfileKey};
use ms_storage_model::{AccountRecord, Record};
use ms_utils::first_non_empty;

use async_trait::async_trait;
use tracing::debug;

/// The account record is a singleton, every remote one matches the local account
pub struct AccountPolicy {
	local: Record<AccountRecord>,
}

impl AccountPolicy {
	pub async fn load(ctx: &mut PassContext<'_>) -> Result<Self, Error> {
		Ok(Self {
			local: local_account_record(&mut *ctx.tx).await?,
		})
	}
}

#[async_trait]
impl MergePolicy for AccountPolicy {
	type Fields = AccountRecord;
	type Key = ();

	async fn is_invalid(
		&self,
		_: &mut PassContext<'_>,
		_: &Record<AccountRecord>,
	) -> Result<bool, Error> {
		Ok(false)
	}

	async fn get_matching(
		&self,
		_: &mut PassContext<'_>,
		_: &Record<AccountRecord>,
	) -> Result<Option<Record<AccountRecord>>, Error> {
		Ok(Some(self.local.clone()))
	}

	fn merge(
		&self,
		ctx: &PassContext<'_>,
		remote: &Record<AccountRecord>,
		local: &Record<AccountRecord>,
	) -> AccountRecord {
		let (remote, local) = (&remote.fields, &local.fields);

		let names = if remote.given_name.is_empty() && remote.family_name.is_empty() {
			local
		} else {
			remote
		};

		AccountRecord {
			given_name: names.given_name.clone(),
			family_name: names.family_name.clone(),
			avatar_url_path: first_non_empty(&remote.avatar_url_path, &local.avatar_url_path),
			profile_key: first_non_empty(&remote.profile_key, &local.profile_key),
			note_to_self_archived: remote.note_to_self_archived,
			note_to_self_marked_unread: remote.note_to_self_marked_unread,
			read_receipts: remote.read_receipts,
			typing_indicators: remote.typing_indicators,
			sealed_sender_indicators: remote.sealed_sender_indicators,
			link_previews: remote.link_previews,
			phone_number_sharing_mode: remote.phone_number_sharing_mode,
			unlisted_phone_number: remote.unlisted_phone_number,
			pinned_conversations: remote.pinned_conversations.clone(),
			prefer_contact_avatars: remote.prefer_contact_avatars,
			payments: if remote.payments.entropy.is_empty() {
				local.payments.clone()
			} else {
				remote.payments.clone()
			},
			universal_expire_timer: remote.universal_expire_timer,
			// Only the primary device knows our number for sure
			e164: if ctx.is_primary_device() {
				local.e164.clone()
			} else {
				remote.e164.clone()
			},
			preferred_reaction_emoji: if remote.preferred_reaction_emoji.is_empty() {
				local.preferred_reaction_emoji.clone()
			} else {
				remote.preferred_reaction_emoji.clone()
			},
			subscriber: if remote.subscriber.id.is_empty() {
				local.subscriber.clone()
			} else {
				remote.subscriber.clone()
			},
			display_badges_on_profile: remote.display_badges_on_profile,
			subscription_manually_cancelled: remote.subscription_manually_cancelled,
			keep_muted_chats_archived: remote.keep_muted_chats_archived,
			has_set_my_stories_privacy: remote.has_set_my_stories_privacy,
			has_viewed_onboarding_story: remote.has_viewed_onboarding_story
				|| local.has_viewed_onboarding_story,
			stories_disabled: remote.stories_disabled,
			has_seen_group_story_education_sheet: remote.has_seen_group_story_education_sheet
				|| local.has_seen_group_story_education_sheet,
			has_completed_username_onboarding: remote.has_completed_username_onboarding
				|| local.has_completed_username_onboarding,
			story_view_receipts_enabled: if remote.story_view_receipts_enabled.is_unset() {
				local.story_view_receipts_enabled
			} else {
				remote.story_view_receipts_enabled
			},
			username: remote.username.clone(),
			username_link: remote.username_link.clone(),
			unknown_fields: remote.unknown_fields.clone(),
		}
	}

	async fn insert_local(
		&self,
		_: &mut PassContext<'_>,
		_: Record<AccountRecord>,
	) -> Result<(), Error> {
		Err(Error::AccountInsert)
	}

	async fn update_local(
		&self,
		ctx: &mut PassContext<'_>,
		update: RecordUpdate<AccountRecord>,
	) -> Result<(), Error> {
		let new = update.new;
		let fields = &new.fields;

		if ctx.self_address.number_or_empty() != fields.e164 {
			debug!("Account number differs from the synced one");
			ctx.enqueue(Job::CheckWhoAmI);
		}

		let mut settings = ctx.tx.settings().await?;
		settings.read_receipts = Some(fields.read_receipts);
		settings.typing_indicators = Some(fields.typing_indicators);
		settings.sealed_sender_indicators = Some(fields.sealed_sender_indicators);
		settings.link_previews = Some(fields.link_previews);
		settings.phone_number_sharing_mode = Some(fields.phone_number_sharing_mode);
		settings.unlisted_phone_number = Some(fields.unlisted_phone_number);
		ctx.tx.set_settings(settings).await?;

		ctx.tx
			.set_username((!fields.username.is_empty()).then(|| fields.username.clone()))
			.await?;
		ctx.tx.set_username_link(fields.username_link.clone()).await?;

		let self_id = ctx.tx.self_recipient_id().await?;

		if let Some(profile_key) = ProfileKey::parse(&fields.profile_key) {
			ctx.tx.store_profile_key(self_id, profile_key).await?;
			ctx.enqueue(Job::DownloadProfileAvatar {
				avatar_path: fields.avatar_url_path.clone(),
			});
		} else if !fields.profile_key.is_empty() {
			debug!("Received invalid profile key from storage");
		}

		ctx.tx
			.store_profile(
				self_id,
				Profile {
					given_name: fields.given_name.clone(),
					family_name: fields.family_name.clone(),
					avatar_url_path: fields.avatar_url_path.clone(),
				},
			)
			.await?;

		ctx.tx
			.store_storage_record(self_id, new.id.clone(), new.encode()?)
			.await?;

		Ok(())
	}

	fn equivalence_keys(&self, _: &Record<AccountRecord>) -> Vec<()> {
		vec![()]
	}
}
