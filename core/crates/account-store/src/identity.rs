use crate::{RecipientId, StoreError};

use ms_storage_model::IdentityState;

use async_trait::async_trait;

const IDENTITY_KEY_LEN: usize = 33;
const DJB_KEY_TYPE: u8 = 0x05;

/// Public identity key of a recipient, in its serialized form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(Vec<u8>);

impl IdentityKey {
	/// Only well formed curve25519 public keys are accepted
	#[must_use]
	pub fn parse(bytes: &[u8]) -> Option<Self> {
		(bytes.len() == IDENTITY_KEY_LEN && bytes[0] == DJB_KEY_TYPE).then(|| Self(bytes.to_vec()))
	}

	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TrustLevel {
	Untrusted,
	#[default]
	TrustedUnverified,
	TrustedVerified,
}

impl From<IdentityState> for TrustLevel {
	fn from(state: IdentityState) -> Self {
		match state {
			IdentityState::Default => Self::TrustedUnverified,
			IdentityState::Verified => Self::TrustedVerified,
			IdentityState::Unverified => Self::Untrusted,
		}
	}
}

impl From<TrustLevel> for IdentityState {
	fn from(level: TrustLevel) -> Self {
		match level {
			TrustLevel::TrustedUnverified => Self::Default,
			TrustLevel::TrustedVerified => Self::Verified,
			TrustLevel::Untrusted => Self::Unverified,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
	pub key: IdentityKey,
	pub trust_level: TrustLevel,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
	async fn identity(&self, id: RecipientId) -> Result<Option<IdentityInfo>, StoreError>;

	/// Saves `key` for the recipient. Returns `true` if it replaced a different key, which
	/// resets the trust level.
	async fn save_identity(&mut self, id: RecipientId, key: IdentityKey)
		-> Result<bool, StoreError>;

	/// Sets the trust level, only if `key` is still the recipient's current key
	async fn set_identity_trust_level(
		&mut self,
		id: RecipientId,
		key: &IdentityKey,
		trust_level: TrustLevel,
	) -> Result<bool, StoreError>;
}
