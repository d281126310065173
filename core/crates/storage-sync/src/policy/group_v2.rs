use crate::{models::local_group_v2_record, Error, MergePolicy, PassContext, RecordUpdate};

use ms_core_account_store::GroupInfo;
use ms_storage_model::{GroupMasterKey, GroupV2Record, Record, GROUP_MASTER_KEY_LEN};

use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Default)]
pub struct GroupV2Policy;

impl GroupV2Policy {
	async fn store(ctx: &mut PassContext<'_>, record: Record<GroupV2Record>) -> Result<(), Error> {
		let master_key = GroupMasterKey::try_from(record.fields.master_key.as_slice())?;

		let mut group = ctx.tx.group_or_partial_migrate(master_key).await?;
		group.blocked = record.fields.blocked;
		group.profile_sharing = record.fields.whitelisted;
		let id = group.id;
		ctx.tx.update_group(GroupInfo::V2(group)).await?;

		ctx.tx
			.store_group_storage_record(id.into(), record.id.clone(), record.encode()?)
			.await?;

		Ok(())
	}
}

#[async_trait]
impl MergePolicy for GroupV2Policy {
	type Fields = GroupV2Record;
	type Key = Vec<u8>;

	async fn is_invalid(
		&self,
		_: &mut PassContext<'_>,
		remote: &Record<GroupV2Record>,
	) -> Result<bool, Error> {
		let invalid = remote.fields.master_key.len() != GROUP_MASTER_KEY_LEN;
		if invalid {
			debug!(
				len = remote.fields.master_key.len(),
				"Group v2 record has a master key of the wrong size"
			);
		}
		Ok(invalid)
	}

	async fn get_matching(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<GroupV2Record>,
	) -> Result<Option<Record<GroupV2Record>>, Error> {
		let master_key = GroupMasterKey::try_from(remote.fields.master_key.as_slice())?;
		let id = master_key.group_id();

		match ctx.tx.group(id.into()).await? {
			Some(GroupInfo::V2(group)) => {
				let storage_id = ctx.tx.group_storage_id(id.into()).await?;
				Ok(Some(local_group_v2_record(&group, storage_id)))
			}
			Some(GroupInfo::V1(_)) | None => Ok(None),
		}
	}

	fn merge(
		&self,
		_: &PassContext<'_>,
		remote: &Record<GroupV2Record>,
		_: &Record<GroupV2Record>,
	) -> GroupV2Record {
		let remote = &remote.fields;

		GroupV2Record {
			master_key: remote.master_key.clone(),
			blocked: remote.blocked,
			whitelisted: remote.whitelisted,
			archived: remote.archived,
			marked_unread: remote.marked_unread,
			mute_until: remote.mute_until,
			dont_notify_for_mentions_if_muted: remote.dont_notify_for_mentions_if_muted,
			hide_story: remote.hide_story,
			story_send_mode: remote.story_send_mode,
			unknown_fields: remote.unknown_fields.clone(),
		}
	}

	async fn insert_local(
		&self,
		ctx: &mut PassContext<'_>,
		remote: Record<GroupV2Record>,
	) -> Result<(), Error> {
		Self::store(ctx, remote).await
	}

	async fn update_local(
		&self,
		ctx: &mut PassContext<'_>,
		update: RecordUpdate<GroupV2Record>,
	) -> Result<(), Error> {
		Self::store(ctx, update.new).await
	}

	fn equivalence_keys(&self, record: &Record<GroupV2Record>) -> Vec<Vec<u8>> {
		vec![record.fields.master_key.clone()]
	}
}
