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

//! Local persistence of an account: recipients, groups, identities and settings.

mod error;
mod group;
mod identity;
mod memory;
mod recipient;
mod settings;
mod transaction;

pub use error::StoreError;
pub use group::{GroupInfo, GroupInfoV1, GroupInfoV2, GroupStore};
pub use identity::{IdentityInfo, IdentityKey, IdentityStore, TrustLevel};
pub use memory::{MemoryAccountStore, MemoryTransaction};
pub use recipient::{
	Contact, Profile, ProfileKey, Recipient, RecipientId, RecipientStore, PROFILE_KEY_LEN,
};
pub use settings::{AccountSettings, SettingsStore};
pub use transaction::{AccountStore, AccountTransaction, UnknownStorageIdStore};
