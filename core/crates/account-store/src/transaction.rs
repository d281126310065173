use crate::{GroupStore, IdentityStore, RecipientStore, SettingsStore, StoreError};

use ms_storage_model::StorageId;

use async_trait::async_trait;

/// Storage ids of records of a kind this client doesn't understand, remembered so
/// they survive our own writes
#[async_trait]
pub trait UnknownStorageIdStore: Send + Sync {
	async fn unknown_storage_ids(&self) -> Result<Vec<StorageId>, StoreError>;

	async fn add_unknown_storage_ids(&mut self, ids: Vec<StorageId>) -> Result<(), StoreError>;

	async fn delete_unknown_storage_ids(&mut self, raw_ids: &[Vec<u8>]) -> Result<(), StoreError>;
}

/// Every store of an account, seen through a single transaction
pub trait AccountTransaction:
	RecipientStore + GroupStore + IdentityStore + SettingsStore + UnknownStorageIdStore
{
}

impl<T> AccountTransaction for T where
	T: RecipientStore + GroupStore + IdentityStore + SettingsStore + UnknownStorageIdStore
{
}

/// Entry point to an account's local state.
///
/// Writes made through a transaction become visible only once it is committed,
/// dropping it rolls every one of them back.
#[async_trait]
pub trait AccountStore: Send + Sync {
	type Transaction: AccountTransaction + 'static;

	async fn begin(&self) -> Result<Self::Transaction, StoreError>;

	async fn commit(&self, tx: Self::Transaction) -> Result<(), StoreError>;
}
