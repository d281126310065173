#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! Record model shared by the local account store and the storage sync engine.

mod address;
mod error;
mod group_id;
mod id;
mod manifest;
mod record;
mod records;

pub use address::{Aci, Pni, RecipientAddress};
pub use error::Error;
pub use group_id::{
	GroupId, GroupIdV1, GroupIdV2, GroupMasterKey, GROUP_ID_V1_LEN, GROUP_ID_V2_LEN,
	GROUP_MASTER_KEY_LEN,
};
pub use id::{RecordKind, StorageId, RAW_ID_LEN};
pub use manifest::Manifest;
pub use record::{Record, RecordFields, RecordPayload, StorageRecord};
pub use records::{
	AccountRecord, ContactRecord, GroupV1Record, GroupV2Record, IdentityState, Name,
	OptionalBool, Payments, PhoneNumberSharingMode, PinnedConversation, StorySendMode, Subscriber,
	UnknownFields, UsernameLink, UsernameLinkColor,
};
