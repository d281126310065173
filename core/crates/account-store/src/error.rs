use crate::RecipientId;

use ms_storage_model::GroupId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("recipient not found: <recipient_id='{0}'>")]
	RecipientNotFound(RecipientId),
	#[error("group not found: <group_id='{0}'>")]
	GroupNotFound(GroupId),
	#[error("v1 group was already migrated: <group_id='{0}'>")]
	GroupMigrated(GroupId),
	#[error("account store backend error: {0}")]
	Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}
