use ms_utils::{random_bytes, to_base64};

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Length of every raw storage identifier minted on this device
pub const RAW_ID_LEN: usize = 16;

/// Kind tag of a storage record, mirroring the wire values of the storage service
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
	Unknown(u32),
	Contact,
	GroupV1,
	GroupV2,
	Account,
	StoryDistributionList,
	CallLink,
}

impl RecordKind {
	#[must_use]
	pub const fn from_wire(value: u32) -> Self {
		match value {
			1 => Self::Contact,
			2 => Self::GroupV1,
			3 => Self::GroupV2,
			4 => Self::Account,
			5 => Self::StoryDistributionList,
			7 => Self::CallLink,
			other => Self::Unknown(other),
		}
	}

	#[must_use]
	pub const fn wire(self) -> u32 {
		match self {
			Self::Unknown(value) => value,
			Self::Contact => 1,
			Self::GroupV1 => 2,
			Self::GroupV2 => 3,
			Self::Account => 4,
			Self::StoryDistributionList => 5,
			Self::CallLink => 7,
		}
	}
}

/// Identifier of a record on the storage service.
///
/// `raw` is opaque; ids minted locally are [`RAW_ID_LEN`] random bytes, remote ids are
/// kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageId {
	pub kind: RecordKind,
	pub raw: Vec<u8>,
}

impl StorageId {
	pub fn new(kind: RecordKind, raw: impl Into<Vec<u8>>) -> Self {
		Self {
			kind,
			raw: raw.into(),
		}
	}

	#[must_use]
	pub fn random(kind: RecordKind) -> Self {
		Self::new(kind, random_bytes::<RAW_ID_LEN>())
	}

	#[must_use]
	pub fn raw(&self) -> &[u8] {
		&self.raw
	}
}

impl fmt::Display for StorageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.kind, to_base64(&self.raw))
	}
}
