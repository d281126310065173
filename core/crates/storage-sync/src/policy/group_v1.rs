use crate::{models::local_group_v1_record, Error, MergePolicy, PassContext, RecordUpdate};

use ms_core_account_store::GroupInfo;
use ms_storage_model::{GroupIdV1, GroupV1Record, Record};

use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Default)]
pub struct GroupV1Policy;

impl GroupV1Policy {
	async fn store(ctx: &mut PassContext<'_>, record: Record<GroupV1Record>) -> Result<(), Error> {
		let id = GroupIdV1::try_from(record.fields.id.as_slice())?;

		let mut group = ctx.tx.get_or_create_group_v1(id).await?;
		group.blocked = record.fields.blocked;
		group.archived = record.fields.archived;
		group.profile_sharing = record.fields.whitelisted;
		ctx.tx.update_group(GroupInfo::V1(group)).await?;

		ctx.tx
			.store_group_storage_record(id.into(), record.id.clone(), record.encode()?)
			.await?;

		Ok(())
	}
}

#[async_trait]
impl MergePolicy for GroupV1Policy {
	type Fields = GroupV1Record;
	type Key = Vec<u8>;

	async fn is_invalid(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<GroupV1Record>,
	) -> Result<bool, Error> {
		let Ok(id) = GroupIdV1::try_from(remote.fields.id.as_slice()) else {
			debug!("Group v1 record doesn't carry a v1 group id");
			return Ok(true);
		};

		if ctx.tx.group(id.expected_v2_id().into()).await?.is_some() {
			debug!("Group v1 record refers to a group that was already migrated");
			return Ok(true);
		}

		Ok(false)
	}

	async fn get_matching(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<GroupV1Record>,
	) -> Result<Option<Record<GroupV1Record>>, Error> {
		let id = GroupIdV1::try_from(remote.fields.id.as_slice())?;

		match ctx.tx.group(id.into()).await? {
			Some(GroupInfo::V1(group)) => {
				let storage_id = ctx.tx.group_storage_id(id.into()).await?;
				Ok(Some(local_group_v1_record(&group, storage_id)))
			}
			Some(GroupInfo::V2(_)) | None => Ok(None),
		}
	}

	fn merge(
		&self,
		_: &PassContext<'_>,
		remote: &Record<GroupV1Record>,
		local: &Record<GroupV1Record>,
	) -> GroupV1Record {
		let remote = &remote.fields;

		GroupV1Record {
			id: local.fields.id.clone(),
			blocked: remote.blocked,
			whitelisted: remote.whitelisted,
			archived: remote.archived,
			marked_unread: remote.marked_unread,
			mute_until: remote.mute_until,
			unknown_fields: remote.unknown_fields.clone(),
		}
	}

	async fn insert_local(
		&self,
		ctx: &mut PassContext<'_>,
		remote: Record<GroupV1Record>,
	) -> Result<(), Error> {
		Self::store(ctx, remote).await
	}

	async fn update_local(
		&self,
		ctx: &mut PassContext<'_>,
		update: RecordUpdate<GroupV1Record>,
	) -> Result<(), Error> {
		Self::store(ctx, update.new).await
	}

	fn equivalence_keys(&self, record: &Record<GroupV1Record>) -> Vec<Vec<u8>> {
		vec![record.fields.id.clone()]
	}
}
