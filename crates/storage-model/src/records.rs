//! Typed payloads of the record kinds the sync engine understands.
//!
//! Empty strings and empty byte vectors stand for "unset", the same way the storage
//! service encodes them. Field order is part of the canonical encoding.

use crate::{Aci, Pni};

use serde::{Deserialize, Serialize};

/// Encoded fields this client doesn't know about, carried along untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnknownFields(pub Vec<u8>);

impl UnknownFields {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneNumberSharingMode {
	#[default]
	Unknown,
	Everybody,
	Nobody,
}

/// Tri-state used by settings that were introduced after the record itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionalBool {
	#[default]
	Unset,
	Enabled,
	Disabled,
}

impl OptionalBool {
	#[must_use]
	pub const fn is_unset(self) -> bool {
		matches!(self, Self::Unset)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payments {
	pub enabled: bool,
	pub entropy: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
	pub id: Vec<u8>,
	pub currency_code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsernameLinkColor {
	#[default]
	Unknown,
	Blue,
	White,
	Grey,
	Olive,
	Green,
	Orange,
	Pink,
	Purple,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameLink {
	pub entropy: Vec<u8>,
	pub server_id: Vec<u8>,
	pub color: UsernameLinkColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinnedConversation {
	Contact {
		aci: Option<Aci>,
		e164: String,
	},
	LegacyGroup {
		group_id: Vec<u8>,
	},
	Group {
		master_key: Vec<u8>,
	},
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
	pub given_name: String,
	pub family_name: String,
	pub avatar_url_path: String,
	pub profile_key: Vec<u8>,
	pub note_to_self_archived: bool,
	pub note_to_self_marked_unread: bool,
	pub read_receipts: bool,
	pub typing_indicators: bool,
	pub sealed_sender_indicators: bool,
	pub link_previews: bool,
	pub phone_number_sharing_mode: PhoneNumberSharingMode,
	pub unlisted_phone_number: bool,
	pub pinned_conversations: Vec<PinnedConversation>,
	pub prefer_contact_avatars: bool,
	pub payments: Payments,
	pub universal_expire_timer: u32,
	pub e164: String,
	pub preferred_reaction_emoji: Vec<String>,
	pub subscriber: Subscriber,
	pub display_badges_on_profile: bool,
	pub subscription_manually_cancelled: bool,
	pub keep_muted_chats_archived: bool,
	pub has_set_my_stories_privacy: bool,
	pub has_viewed_onboarding_story: bool,
	pub stories_disabled: bool,
	pub has_seen_group_story_education_sheet: bool,
	pub has_completed_username_onboarding: bool,
	pub story_view_receipts_enabled: OptionalBool,
	pub username: String,
	pub username_link: Option<UsernameLink>,
	pub unknown_fields: UnknownFields,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityState {
	#[default]
	Default,
	Verified,
	Unverified,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
	pub given: String,
	pub family: String,
}

impl Name {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.given.is_empty() && self.family.is_empty()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
	pub aci: Option<Aci>,
	pub pni: Option<Pni>,
	pub e164: String,
	pub username: String,
	pub profile_key: Vec<u8>,
	pub identity_key: Vec<u8>,
	pub identity_state: IdentityState,
	pub given_name: String,
	pub family_name: String,
	pub system_given_name: String,
	pub system_family_name: String,
	pub system_nickname: String,
	pub blocked: bool,
	pub whitelisted: bool,
	pub archived: bool,
	pub marked_unread: bool,
	pub mute_until: u64,
	pub hide_story: bool,
	pub unregistered_at: u64,
	pub hidden: bool,
	pub pni_signature_verified: bool,
	pub nickname: Name,
	pub note: String,
	pub unknown_fields: UnknownFields,
}

impl ContactRecord {
	/// Aci of this contact, if present and not the nil uuid
	#[must_use]
	pub fn valid_aci(&self) -> Option<Aci> {
		self.aci.filter(Aci::is_valid)
	}

	#[must_use]
	pub fn valid_pni(&self) -> Option<Pni> {
		self.pni.filter(Pni::is_valid)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV1Record {
	pub id: Vec<u8>,
	pub blocked: bool,
	pub whitelisted: bool,
	pub archived: bool,
	pub marked_unread: bool,
	pub mute_until: u64,
	pub unknown_fields: UnknownFields,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorySendMode {
	#[default]
	Default,
	Disabled,
	Enabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV2Record {
	pub master_key: Vec<u8>,
	pub blocked: bool,
	pub whitelisted: bool,
	pub archived: bool,
	pub marked_unread: bool,
	pub mute_until: u64,
	pub dont_notify_for_mentions_if_muted: bool,
	pub hide_story: bool,
	pub story_send_mode: StorySendMode,
	pub unknown_fields: UnknownFields,
}
