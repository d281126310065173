use crate::StoreError;

use ms_storage_model::{GroupId, GroupIdV1, GroupIdV2, GroupMasterKey, StorageId};

use async_trait::async_trait;

/// A legacy group, only kept around until it gets migrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfoV1 {
	pub id: GroupIdV1,
	pub expected_v2_id: GroupIdV2,
	pub blocked: bool,
	pub archived: bool,
	pub profile_sharing: bool,
	pub storage_id: Option<StorageId>,
	pub storage_record: Option<Vec<u8>>,
}

impl GroupInfoV1 {
	#[must_use]
	pub fn new(id: GroupIdV1) -> Self {
		Self {
			id,
			expected_v2_id: id.expected_v2_id(),
			blocked: false,
			archived: false,
			profile_sharing: false,
			storage_id: None,
			storage_record: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfoV2 {
	pub id: GroupIdV2,
	pub master_key: GroupMasterKey,
	pub blocked: bool,
	pub profile_sharing: bool,
	pub storage_id: Option<StorageId>,
	pub storage_record: Option<Vec<u8>>,
}

impl GroupInfoV2 {
	#[must_use]
	pub fn new(master_key: GroupMasterKey) -> Self {
		Self {
			id: master_key.group_id(),
			master_key,
			blocked: false,
			profile_sharing: false,
			storage_id: None,
			storage_record: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupInfo {
	V1(GroupInfoV1),
	V2(GroupInfoV2),
}

impl GroupInfo {
	#[must_use]
	pub fn id(&self) -> GroupId {
		match self {
			Self::V1(group) => group.id.into(),
			Self::V2(group) => group.id.into(),
		}
	}

	#[must_use]
	pub const fn storage_id(&self) -> Option<&StorageId> {
		match self {
			Self::V1(group) => group.storage_id.as_ref(),
			Self::V2(group) => group.storage_id.as_ref(),
		}
	}
}

#[async_trait]
pub trait GroupStore: Send + Sync {
	async fn group(&self, id: GroupId) -> Result<Option<GroupInfo>, StoreError>;

	async fn groups(&self) -> Result<Vec<GroupInfo>, StoreError>;

	/// Gets the v1 group, creating an empty shell for it if missing.
	///
	/// Fails with [`StoreError::GroupMigrated`] when the group already exists as a v2 group.
	async fn get_or_create_group_v1(&mut self, id: GroupIdV1) -> Result<GroupInfoV1, StoreError>;

	/// Gets the v2 group for `master_key`, creating it if missing.
	///
	/// A v1 group whose expected v2 id matches is replaced by the new v2 group, carrying
	/// over its blocked state.
	async fn group_or_partial_migrate(
		&mut self,
		master_key: GroupMasterKey,
	) -> Result<GroupInfoV2, StoreError>;

	async fn update_group(&mut self, group: GroupInfo) -> Result<(), StoreError>;

	async fn group_storage_id(&mut self, id: GroupId) -> Result<StorageId, StoreError>;

	async fn set_group_storage_id(
		&mut self,
		id: GroupId,
		storage_id: StorageId,
	) -> Result<(), StoreError>;

	async fn store_group_storage_record(
		&mut self,
		id: GroupId,
		storage_id: StorageId,
		record: Vec<u8>,
	) -> Result<(), StoreError>;
}
