use ms_core_account_store::{
	AccountStore, GroupInfo, GroupStore, MemoryAccountStore, Recipient, RecipientStore,
};
use ms_core_storage_sync::{DeviceRole, Job, StorageSyncManager, SyncConfig};
use ms_storage_model::{
	Aci, ContactRecord, GroupId, Manifest, Pni, RecipientAddress, Record, RecordKind, StorageId,
	StorageRecord,
};

use async_channel::Receiver;
use uuid::Uuid;

pub const SELF_NUMBER: &str = "+4915100000000";

pub fn aci() -> Aci {
	Aci::from_uuid(Uuid::new_v4())
}

pub fn pni() -> Pni {
	Pni::from_uuid(Uuid::new_v4())
}

pub fn profile_key(seed: u8) -> Vec<u8> {
	vec![seed; 32]
}

pub fn identity_key(seed: u8) -> Vec<u8> {
	let mut key = vec![0x05];
	key.extend([seed; 32]);
	key
}

pub fn contact(aci: Aci, e164: &str) -> Record<ContactRecord> {
	Record::new(
		StorageId::random(RecordKind::Contact),
		ContactRecord {
			aci: Some(aci),
			e164: e164.to_string(),
			..Default::default()
		},
	)
}

pub fn manifest(version: u64, records: &[StorageRecord]) -> Manifest {
	Manifest::new(version, records.iter().map(|record| record.id.clone()).collect())
}

/// An account backed by the in memory store, with its sync manager and job queue
pub struct Account {
	pub self_address: RecipientAddress,
	pub store: MemoryAccountStore,
	pub manager: StorageSyncManager<MemoryAccountStore>,
	pub jobs: Receiver<Job>,
}

impl Account {
	pub fn new(device_role: DeviceRole) -> Self {
		let self_address = RecipientAddress::from_parts(Some(aci()), Some(pni()), SELF_NUMBER, "");
		let store = MemoryAccountStore::new(self_address.clone());

		let (manager, jobs) = StorageSyncManager::with_channel_jobs(
			store.clone(),
			SyncConfig {
				device_role,
				log_record_diffs: true,
				..Default::default()
			},
		);

		Self {
			self_address,
			store,
			manager,
			jobs,
		}
	}

	pub fn drain_jobs(&self) -> Vec<Job> {
		std::iter::from_fn(|| self.jobs.try_recv().ok()).collect()
	}

	pub async fn contacts(&self) -> Vec<Recipient> {
		let tx = self.store.begin().await.unwrap();
		let mut contacts = Vec::new();
		for id in tx.contact_recipient_ids().await.unwrap() {
			contacts.extend(tx.recipient(id).await.unwrap());
		}
		contacts
	}

	pub async fn contact_by_aci(&self, aci: Aci) -> Option<Recipient> {
		self.contacts()
			.await
			.into_iter()
			.find(|recipient| recipient.address.aci == Some(aci))
	}

	pub async fn self_recipient(&self) -> Recipient {
		let tx = self.store.begin().await.unwrap();
		let id = tx.self_recipient_id().await.unwrap();
		tx.recipient(id).await.unwrap().unwrap()
	}

	pub async fn group(&self, id: impl Into<GroupId> + Send) -> Option<GroupInfo> {
		let tx = self.store.begin().await.unwrap();
		tx.group(id.into()).await.unwrap()
	}
}
