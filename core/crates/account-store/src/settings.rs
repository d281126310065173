use crate::StoreError;

use ms_storage_model::{PhoneNumberSharingMode, UsernameLink};

use async_trait::async_trait;

/// Account wide settings. `None` means the setting was never set on this device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSettings {
	pub read_receipts: Option<bool>,
	pub typing_indicators: Option<bool>,
	pub sealed_sender_indicators: Option<bool>,
	pub link_previews: Option<bool>,
	pub phone_number_sharing_mode: Option<PhoneNumberSharingMode>,
	pub unlisted_phone_number: Option<bool>,
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
	async fn settings(&self) -> Result<AccountSettings, StoreError>;

	async fn set_settings(&mut self, settings: AccountSettings) -> Result<(), StoreError>;

	async fn username(&self) -> Result<Option<String>, StoreError>;

	async fn set_username(&mut self, username: Option<String>) -> Result<(), StoreError>;

	async fn username_link(&self) -> Result<Option<UsernameLink>, StoreError>;

	async fn set_username_link(&mut self, link: Option<UsernameLink>) -> Result<(), StoreError>;

	/// Version of the last remote manifest that was applied locally
	async fn storage_manifest_version(&self) -> Result<u64, StoreError>;

	async fn set_storage_manifest_version(&mut self, version: u64) -> Result<(), StoreError>;
}
