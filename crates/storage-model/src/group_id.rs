use crate::Error;

use std::fmt;

use ms_utils::to_base64;
use serde::{Deserialize, Serialize};

pub const GROUP_ID_V1_LEN: usize = 16;
pub const GROUP_ID_V2_LEN: usize = 32;
pub const GROUP_MASTER_KEY_LEN: usize = 32;

const V2_ID_CONTEXT: &str = "ms-storage-model 2024-05-01 group v2 id from master key";
const MIGRATION_CONTEXT: &str = "ms-storage-model 2024-05-01 group v1 migration master key";

fn fixed<const N: usize>(bytes: &[u8], what: &'static str) -> Result<[u8; N], Error> {
	bytes.try_into().map_err(|_| Error::InvalidLength {
		what,
		expected: N,
		got: bytes.len(),
	})
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupIdV1([u8; GROUP_ID_V1_LEN]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupIdV2([u8; GROUP_ID_V2_LEN]);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMasterKey([u8; GROUP_MASTER_KEY_LEN]);

impl GroupIdV1 {
	#[must_use]
	pub const fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Master key the group received when it was migrated to a v2 group
	#[must_use]
	pub fn migrated_master_key(&self) -> GroupMasterKey {
		GroupMasterKey(blake3::derive_key(MIGRATION_CONTEXT, &self.0))
	}

	#[must_use]
	pub fn expected_v2_id(&self) -> GroupIdV2 {
		self.migrated_master_key().group_id()
	}
}

impl GroupIdV2 {
	#[must_use]
	pub const fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl GroupMasterKey {
	#[must_use]
	pub const fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	#[must_use]
	pub fn group_id(&self) -> GroupIdV2 {
		GroupIdV2(blake3::derive_key(V2_ID_CONTEXT, &self.0))
	}
}

impl TryFrom<&[u8]> for GroupIdV1 {
	type Error = Error;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		fixed(bytes, "group v1 id").map(Self)
	}
}

impl TryFrom<&[u8]> for GroupIdV2 {
	type Error = Error;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		fixed(bytes, "group v2 id").map(Self)
	}
}

impl TryFrom<&[u8]> for GroupMasterKey {
	type Error = Error;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		fixed(bytes, "group master key").map(Self)
	}
}

impl fmt::Debug for GroupMasterKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("GroupMasterKey(..)")
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupId {
	V1(GroupIdV1),
	V2(GroupIdV2),
}

impl GroupId {
	/// Tells the version apart by the id length
	pub fn unknown_version(bytes: &[u8]) -> Result<Self, Error> {
		match bytes.len() {
			GROUP_ID_V1_LEN => GroupIdV1::try_from(bytes).map(Self::V1),
			GROUP_ID_V2_LEN => GroupIdV2::try_from(bytes).map(Self::V2),
			got => Err(Error::InvalidLength {
				what: "group id",
				expected: GROUP_ID_V1_LEN,
				got,
			}),
		}
	}

	#[must_use]
	pub const fn as_bytes(&self) -> &[u8] {
		match self {
			Self::V1(id) => id.as_bytes(),
			Self::V2(id) => id.as_bytes(),
		}
	}
}

impl From<GroupIdV1> for GroupId {
	fn from(id: GroupIdV1) -> Self {
		Self::V1(id)
	}
}

impl From<GroupIdV2> for GroupId {
	fn from(id: GroupIdV2) -> Self {
		Self::V2(id)
	}
}

impl fmt::Display for GroupId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&to_base64(self.as_bytes()))
	}
}
