use crate::StoreError;

use ms_storage_model::{RecipientAddress, RecordKind, StorageId};

use std::fmt;

use async_trait::async_trait;

pub const PROFILE_KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipientId(pub u64);

impl fmt::Display for RecipientId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// What the user's system address book (and they themselves) know about a recipient
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
	pub given_name: String,
	pub family_name: String,
	pub nickname: String,
	pub nickname_given_name: String,
	pub nickname_family_name: String,
	pub note: String,
	pub mute_until: u64,
	pub hide_story: bool,
	pub blocked: bool,
	pub archived: bool,
	pub profile_sharing: bool,
	pub hidden: bool,
	pub unregistered_at: Option<u64>,
}

/// What the recipient publishes about themselves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
	pub given_name: String,
	pub family_name: String,
	pub avatar_url_path: String,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey([u8; PROFILE_KEY_LEN]);

impl ProfileKey {
	/// Parses a profile key, `None` when the bytes have the wrong length
	#[must_use]
	pub fn parse(bytes: &[u8]) -> Option<Self> {
		bytes.try_into().ok().map(Self)
	}

	#[must_use]
	pub const fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Debug for ProfileKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ProfileKey(..)")
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
	pub id: RecipientId,
	pub address: RecipientAddress,
	pub contact: Option<Contact>,
	pub profile: Option<Profile>,
	pub profile_key: Option<ProfileKey>,
	pub storage_id: Option<StorageId>,
	/// Canonical bytes of the last record stored for this recipient
	pub storage_record: Option<Vec<u8>>,
}

impl Recipient {
	#[must_use]
	pub const fn new(id: RecipientId, address: RecipientAddress) -> Self {
		Self {
			id,
			address,
			contact: None,
			profile: None,
			profile_key: None,
			storage_id: None,
			storage_record: None,
		}
	}
}

#[async_trait]
pub trait RecipientStore: Send + Sync {
	async fn self_recipient_id(&self) -> Result<RecipientId, StoreError>;

	async fn recipient(&self, id: RecipientId) -> Result<Option<Recipient>, StoreError>;

	/// Recipients that are synced as contacts: everyone with a service id, except ourselves
	async fn contact_recipient_ids(&self) -> Result<Vec<RecipientId>, StoreError>;

	/// Finds the recipient best matching `address`, creating it when none does.
	///
	/// Never moves identifiers between existing recipients.
	async fn resolve_recipient(
		&mut self,
		address: &RecipientAddress,
	) -> Result<RecipientId, StoreError>;

	/// Like [`RecipientStore::resolve_recipient`], but `address` is trusted to be a single
	/// person: identifiers it carries are taken away from other recipients, which are merged
	/// into the result once they have nothing left.
	async fn resolve_recipient_trusted(
		&mut self,
		address: &RecipientAddress,
	) -> Result<RecipientId, StoreError>;

	async fn store_contact(&mut self, id: RecipientId, contact: Contact) -> Result<(), StoreError>;

	async fn store_profile(&mut self, id: RecipientId, profile: Profile) -> Result<(), StoreError>;

	async fn store_profile_key(
		&mut self,
		id: RecipientId,
		profile_key: ProfileKey,
	) -> Result<(), StoreError>;

	/// Storage id of the recipient, minting and remembering a random one of `kind` if it
	/// doesn't have one yet
	async fn storage_id(
		&mut self,
		id: RecipientId,
		kind: RecordKind,
	) -> Result<StorageId, StoreError>;

	async fn set_storage_id(
		&mut self,
		id: RecipientId,
		storage_id: StorageId,
	) -> Result<(), StoreError>;

	async fn store_storage_record(
		&mut self,
		id: RecipientId,
		storage_id: StorageId,
		record: Vec<u8>,
	) -> Result<(), StoreError>;
}
