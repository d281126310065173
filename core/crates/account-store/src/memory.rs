use crate::{
	AccountSettings, AccountStore, Contact, GroupInfo, GroupInfoV1, GroupInfoV2, GroupStore,
	IdentityInfo, IdentityKey, IdentityStore, Profile, ProfileKey, Recipient, RecipientId,
	RecipientStore, SettingsStore, StoreError, TrustLevel, UnknownStorageIdStore,
};

use ms_storage_model::{
	GroupId, GroupIdV1, GroupMasterKey, RecipientAddress, RecordKind, StorageId, UsernameLink,
};

use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone)]
struct MemoryState {
	self_id: RecipientId,
	next_recipient_id: u64,
	recipients: BTreeMap<RecipientId, Recipient>,
	groups: Vec<GroupInfo>,
	identities: HashMap<RecipientId, IdentityInfo>,
	settings: AccountSettings,
	username: Option<String>,
	username_link: Option<UsernameLink>,
	unknown_storage_ids: Vec<StorageId>,
	manifest_version: u64,
}

impl MemoryState {
	fn new(self_address: RecipientAddress) -> Self {
		let self_id = RecipientId(0);
		Self {
			self_id,
			next_recipient_id: 1,
			recipients: BTreeMap::from([(self_id, Recipient::new(self_id, self_address))]),
			groups: Vec::new(),
			identities: HashMap::new(),
			settings: AccountSettings::default(),
			username: None,
			username_link: None,
			unknown_storage_ids: Vec::new(),
			manifest_version: 0,
		}
	}

	fn find(&self, predicate: impl Fn(&RecipientAddress) -> bool) -> Option<RecipientId> {
		self.recipients
			.values()
			.find(|recipient| predicate(&recipient.address))
			.map(|recipient| recipient.id)
	}

	fn find_by_aci(&self, address: &RecipientAddress) -> Option<RecipientId> {
		address
			.aci
			.and_then(|aci| self.find(|candidate| candidate.aci == Some(aci)))
	}

	fn find_by_pni(&self, address: &RecipientAddress) -> Option<RecipientId> {
		address
			.pni
			.and_then(|pni| self.find(|candidate| candidate.pni == Some(pni)))
	}

	fn find_by_number(&self, address: &RecipientAddress) -> Option<RecipientId> {
		address.number.as_deref().and_then(|number| {
			self.find(|candidate| candidate.number.as_deref() == Some(number))
		})
	}

	fn insert_recipient(&mut self, address: RecipientAddress) -> RecipientId {
		let id = RecipientId(self.next_recipient_id);
		self.next_recipient_id += 1;
		self.recipients.insert(id, Recipient::new(id, address));
		id
	}

	fn recipient_mut(&mut self, id: RecipientId) -> Result<&mut Recipient, StoreError> {
		self.recipients
			.get_mut(&id)
			.ok_or(StoreError::RecipientNotFound(id))
	}

	/// Takes the identifiers of `address` away from `other`, merging what's left of it into
	/// `into` once it has no identifier at all
	fn detach(&mut self, other: RecipientId, address: &RecipientAddress, into: RecipientId) {
		let Some(recipient) = self.recipients.get_mut(&other) else {
			return;
		};

		if address.pni.is_some() && recipient.address.pni == address.pni {
			recipient.address.pni = None;
		}
		if address.number.is_some() && recipient.address.number == address.number {
			recipient.address.number = None;
		}

		let emptied = recipient.address.aci.is_none()
			&& recipient.address.pni.is_none()
			&& recipient.address.number.is_none();
		if !emptied {
			debug!(%other, %into, "Moved identifiers between recipients");
			return;
		}

		let Some(merged) = self.recipients.remove(&other) else {
			return;
		};
		let identity = self.identities.remove(&other);
		if let Some(target) = self.recipients.get_mut(&into) {
			target.contact = target.contact.take().or(merged.contact);
			target.profile = target.profile.take().or(merged.profile);
			target.profile_key = target.profile_key.or(merged.profile_key);
			if target.address.username.is_none() {
				target.address.username = merged.address.username;
			}
		}
		if let Some(identity) = identity {
			self.identities.entry(into).or_insert(identity);
		}
		debug!(%other, %into, "Merged recipients");
	}

	fn group_position(&self, id: GroupId) -> Option<usize> {
		self.groups.iter().position(|group| group.id() == id)
	}
}

/// Account store kept entirely in memory, used by tests and short lived sessions
#[derive(Debug, Clone)]
pub struct MemoryAccountStore {
	state: Arc<Mutex<MemoryState>>,
}

impl MemoryAccountStore {
	#[must_use]
	pub fn new(self_address: RecipientAddress) -> Self {
		Self {
			state: Arc::new(Mutex::new(MemoryState::new(self_address))),
		}
	}
}

/// Holds the store lock for its whole lifetime and works on a private copy of the state
#[derive(Debug)]
pub struct MemoryTransaction {
	guard: OwnedMutexGuard<MemoryState>,
	state: MemoryState,
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
	type Transaction = MemoryTransaction;

	async fn begin(&self) -> Result<Self::Transaction, StoreError> {
		let guard = Arc::clone(&self.state).lock_owned().await;
		let state = guard.clone();
		Ok(MemoryTransaction { guard, state })
	}

	async fn commit(&self, tx: Self::Transaction) -> Result<(), StoreError> {
		let MemoryTransaction { mut guard, state } = tx;
		*guard = state;
		Ok(())
	}
}

#[async_trait]
impl RecipientStore for MemoryTransaction {
	async fn self_recipient_id(&self) -> Result<RecipientId, StoreError> {
		Ok(self.state.self_id)
	}

	async fn recipient(&self, id: RecipientId) -> Result<Option<Recipient>, StoreError> {
		Ok(self.state.recipients.get(&id).cloned())
	}

	async fn contact_recipient_ids(&self) -> Result<Vec<RecipientId>, StoreError> {
		Ok(self
			.state
			.recipients
			.values()
			.filter(|recipient| {
				recipient.id != self.state.self_id && recipient.address.has_service_id()
			})
			.map(|recipient| recipient.id)
			.collect())
	}

	async fn resolve_recipient(
		&mut self,
		address: &RecipientAddress,
	) -> Result<RecipientId, StoreError> {
		let found = self
			.state
			.find_by_aci(address)
			.or_else(|| self.state.find_by_pni(address))
			.or_else(|| self.state.find_by_number(address));

		Ok(found.unwrap_or_else(|| self.state.insert_recipient(address.clone())))
	}

	async fn resolve_recipient_trusted(
		&mut self,
		address: &RecipientAddress,
	) -> Result<RecipientId, StoreError> {
		let state = &mut self.state;
		let by_aci = state.find_by_aci(address);
		let by_pni = state.find_by_pni(address);
		let by_number = state.find_by_number(address);

		// A recipient found by pni or number can only absorb the address if it has no other aci
		let primary = by_aci.or_else(|| {
			[by_pni, by_number].into_iter().flatten().find(|id| {
				state.recipients.get(id).is_some_and(|recipient| {
					match (address.aci, recipient.address.aci) {
						(Some(wanted), Some(existing)) => wanted == existing,
						_ => true,
					}
				})
			})
		});
		let primary = primary.unwrap_or_else(|| state.insert_recipient(address.clone()));

		for other in [by_pni, by_number].into_iter().flatten() {
			if other != primary {
				state.detach(other, address, primary);
			}
		}

		let recipient = state.recipient_mut(primary)?;
		let current = &mut recipient.address;
		current.aci = address.aci.or(current.aci);
		current.pni = address.pni.or(current.pni);
		if address.number.is_some() {
			current.number.clone_from(&address.number);
		}
		if address.username.is_some() {
			current.username.clone_from(&address.username);
		}

		Ok(primary)
	}

	async fn store_contact(&mut self, id: RecipientId, contact: Contact) -> Result<(), StoreError> {
		self.state.recipient_mut(id)?.contact = Some(contact);
		Ok(())
	}

	async fn store_profile(&mut self, id: RecipientId, profile: Profile) -> Result<(), StoreError> {
		self.state.recipient_mut(id)?.profile = Some(profile);
		Ok(())
	}

	async fn store_profile_key(
		&mut self,
		id: RecipientId,
		profile_key: ProfileKey,
	) -> Result<(), StoreError> {
		self.state.recipient_mut(id)?.profile_key = Some(profile_key);
		Ok(())
	}

	async fn storage_id(
		&mut self,
		id: RecipientId,
		kind: RecordKind,
	) -> Result<StorageId, StoreError> {
		let recipient = self.state.recipient_mut(id)?;
		Ok(recipient
			.storage_id
			.get_or_insert_with(|| StorageId::random(kind))
			.clone())
	}

	async fn set_storage_id(
		&mut self,
		id: RecipientId,
		storage_id: StorageId,
	) -> Result<(), StoreError> {
		self.state.recipient_mut(id)?.storage_id = Some(storage_id);
		Ok(())
	}

	async fn store_storage_record(
		&mut self,
		id: RecipientId,
		storage_id: StorageId,
		record: Vec<u8>,
	) -> Result<(), StoreError> {
		let recipient = self.state.recipient_mut(id)?;
		recipient.storage_id = Some(storage_id);
		recipient.storage_record = Some(record);
		Ok(())
	}
}

#[async_trait]
impl GroupStore for MemoryTransaction {
	async fn group(&self, id: GroupId) -> Result<Option<GroupInfo>, StoreError> {
		Ok(self
			.state
			.group_position(id)
			.map(|position| self.state.groups[position].clone()))
	}

	async fn groups(&self) -> Result<Vec<GroupInfo>, StoreError> {
		Ok(self.state.groups.clone())
	}

	async fn get_or_create_group_v1(&mut self, id: GroupIdV1) -> Result<GroupInfoV1, StoreError> {
		if self.state.group_position(id.expected_v2_id().into()).is_some() {
			return Err(StoreError::GroupMigrated(id.into()));
		}

		if let Some(position) = self.state.group_position(id.into()) {
			if let GroupInfo::V1(group) = &self.state.groups[position] {
				return Ok(group.clone());
			}
		}

		let group = GroupInfoV1::new(id);
		self.state.groups.push(GroupInfo::V1(group.clone()));
		Ok(group)
	}

	async fn group_or_partial_migrate(
		&mut self,
		master_key: GroupMasterKey,
	) -> Result<GroupInfoV2, StoreError> {
		let id = master_key.group_id();
		if let Some(position) = self.state.group_position(id.into()) {
			if let GroupInfo::V2(group) = &self.state.groups[position] {
				return Ok(group.clone());
			}
		}

		let mut group = GroupInfoV2::new(master_key);
		let legacy = self.state.groups.iter().position(
			|candidate| matches!(candidate, GroupInfo::V1(v1) if v1.expected_v2_id == id),
		);
		if let Some(position) = legacy {
			if let GroupInfo::V1(v1) = self.state.groups.remove(position) {
				debug!(v1_id = %GroupId::from(v1.id), "Partially migrated group");
				group.blocked = v1.blocked;
				group.profile_sharing = v1.profile_sharing;
			}
		}

		self.state.groups.push(GroupInfo::V2(group.clone()));
		Ok(group)
	}

	async fn update_group(&mut self, group: GroupInfo) -> Result<(), StoreError> {
		match self.state.group_position(group.id()) {
			Some(position) => self.state.groups[position] = group,
			None => self.state.groups.push(group),
		}
		Ok(())
	}

	async fn group_storage_id(&mut self, id: GroupId) -> Result<StorageId, StoreError> {
		let position = self
			.state
			.group_position(id)
			.ok_or(StoreError::GroupNotFound(id))?;

		Ok(match &mut self.state.groups[position] {
			GroupInfo::V1(group) => group
				.storage_id
				.get_or_insert_with(|| StorageId::random(RecordKind::GroupV1))
				.clone(),
			GroupInfo::V2(group) => group
				.storage_id
				.get_or_insert_with(|| StorageId::random(RecordKind::GroupV2))
				.clone(),
		})
	}

	async fn set_group_storage_id(
		&mut self,
		id: GroupId,
		storage_id: StorageId,
	) -> Result<(), StoreError> {
		let position = self
			.state
			.group_position(id)
			.ok_or(StoreError::GroupNotFound(id))?;

		match &mut self.state.groups[position] {
			GroupInfo::V1(group) => group.storage_id = Some(storage_id),
			GroupInfo::V2(group) => group.storage_id = Some(storage_id),
		}
		Ok(())
	}

	async fn store_group_storage_record(
		&mut self,
		id: GroupId,
		storage_id: StorageId,
		record: Vec<u8>,
	) -> Result<(), StoreError> {
		let position = self
			.state
			.group_position(id)
			.ok_or(StoreError::GroupNotFound(id))?;

		match &mut self.state.groups[position] {
			GroupInfo::V1(group) => {
				group.storage_id = Some(storage_id);
				group.storage_record = Some(record);
			}
			GroupInfo::V2(group) => {
				group.storage_id = Some(storage_id);
				group.storage_record = Some(record);
			}
		}
		Ok(())
	}
}

#[async_trait]
impl IdentityStore for MemoryTransaction {
	async fn identity(&self, id: RecipientId) -> Result<Option<IdentityInfo>, StoreError> {
		Ok(self.state.identities.get(&id).cloned())
	}

	async fn save_identity(
		&mut self,
		id: RecipientId,
		key: IdentityKey,
	) -> Result<bool, StoreError> {
		if self
			.state
			.identities
			.get(&id)
			.is_some_and(|identity| identity.key == key)
		{
			return Ok(false);
		}

		let replaced = self
			.state
			.identities
			.insert(
				id,
				IdentityInfo {
					key,
					trust_level: TrustLevel::default(),
				},
			)
			.is_some();
		Ok(replaced)
	}

	async fn set_identity_trust_level(
		&mut self,
		id: RecipientId,
		key: &IdentityKey,
		trust_level: TrustLevel,
	) -> Result<bool, StoreError> {
		match self.state.identities.get_mut(&id) {
			Some(identity) if identity.key == *key => {
				identity.trust_level = trust_level;
				Ok(true)
			}
			_ => Ok(false),
		}
	}
}

#[async_trait]
impl SettingsStore for MemoryTransaction {
	async fn settings(&self) -> Result<AccountSettings, StoreError> {
		Ok(self.state.settings.clone())
	}

	async fn set_settings(&mut self, settings: AccountSettings) -> Result<(), StoreError> {
		self.state.settings = settings;
		Ok(())
	}

	async fn username(&self) -> Result<Option<String>, StoreError> {
		Ok(self.state.username.clone())
	}

	async fn set_username(&mut self, username: Option<String>) -> Result<(), StoreError> {
		self.state.username = username;
		Ok(())
	}

	async fn username_link(&self) -> Result<Option<UsernameLink>, StoreError> {
		Ok(self.state.username_link.clone())
	}

	async fn set_username_link(&mut self, link: Option<UsernameLink>) -> Result<(), StoreError> {
		self.state.username_link = link;
		Ok(())
	}

	async fn storage_manifest_version(&self) -> Result<u64, StoreError> {
		Ok(self.state.manifest_version)
	}

	async fn set_storage_manifest_version(&mut self, version: u64) -> Result<(), StoreError> {
		self.state.manifest_version = version;
		Ok(())
	}
}

#[async_trait]
impl UnknownStorageIdStore for MemoryTransaction {
	async fn unknown_storage_ids(&self) -> Result<Vec<StorageId>, StoreError> {
		Ok(self.state.unknown_storage_ids.clone())
	}

	async fn add_unknown_storage_ids(&mut self, ids: Vec<StorageId>) -> Result<(), StoreError> {
		for id in ids {
			if !self.state.unknown_storage_ids.contains(&id) {
				self.state.unknown_storage_ids.push(id);
			}
		}
		Ok(())
	}

	async fn delete_unknown_storage_ids(&mut self, raw_ids: &[Vec<u8>]) -> Result<(), StoreError> {
		self.state
			.unknown_storage_ids
			.retain(|id| !raw_ids.iter().any(|raw| raw == id.raw()));
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use ms_storage_model::{Aci, GroupIdV1, Pni, GROUP_ID_V1_LEN};

	use tracing_test::traced_test;
	use uuid::Uuid;

	fn aci() -> Aci {
		Aci::from_uuid(Uuid::new_v4())
	}

	fn pni() -> Pni {
		Pni::from_uuid(Uuid::new_v4())
	}

	fn store() -> MemoryAccountStore {
		MemoryAccountStore::new(RecipientAddress::from_aci(aci()))
	}

	#[tokio::test]
	#[traced_test]
	async fn dropped_transactions_roll_back() {
		let store = store();
		let address = RecipientAddress::from_aci(aci());

		{
			let mut tx = store.begin().await.unwrap();
			tx.resolve_recipient(&address).await.unwrap();
			tx.set_storage_manifest_version(3).await.unwrap();
		}

		let tx = store.begin().await.unwrap();
		assert_eq!(tx.storage_manifest_version().await.unwrap(), 0);
		assert!(tx.contact_recipient_ids().await.unwrap().is_empty());
	}

	#[tokio::test]
	#[traced_test]
	async fn committed_transactions_are_visible() {
		let store = store();
		let mut tx = store.begin().await.unwrap();
		let id = tx
			.resolve_recipient(&RecipientAddress::from_aci(aci()))
			.await
			.unwrap();
		store.commit(tx).await.unwrap();

		let tx = store.begin().await.unwrap();
		assert_eq!(tx.contact_recipient_ids().await.unwrap(), vec![id]);
	}

	#[tokio::test]
	#[traced_test]
	async fn trusted_resolution_moves_and_merges_identifiers() {
		let store = store();
		let mut tx = store.begin().await.unwrap();

		let (aci, pni) = (aci(), pni());
		let by_aci = tx
			.resolve_recipient(&RecipientAddress::from_aci(aci))
			.await
			.unwrap();
		let by_pni = tx
			.resolve_recipient(&RecipientAddress::from_parts(None, Some(pni), "+4915100000001", ""))
			.await
			.unwrap();
		assert_ne!(by_aci, by_pni);

		let resolved = tx
			.resolve_recipient_trusted(&RecipientAddress::from_parts(
				Some(aci),
				Some(pni),
				"+4915100000001",
				"",
			))
			.await
			.unwrap();

		assert_eq!(resolved, by_aci);
		assert!(tx.recipient(by_pni).await.unwrap().is_none());
		let merged = tx.recipient(by_aci).await.unwrap().unwrap();
		assert_eq!(merged.address.pni, Some(pni));
		assert_eq!(merged.address.number.as_deref(), Some("+4915100000001"));
	}

	#[tokio::test]
	#[traced_test]
	async fn trusted_resolution_splits_conflicting_aci() {
		let store = store();
		let mut tx = store.begin().await.unwrap();

		let pni = pni();
		let existing = tx
			.resolve_recipient(&RecipientAddress::from_parts(Some(aci()), Some(pni), "", ""))
			.await
			.unwrap();
		let other = aci();
		let resolved = tx
			.resolve_recipient_trusted(&RecipientAddress::from_parts(Some(other), Some(pni), "", ""))
			.await
			.unwrap();

		assert_ne!(resolved, existing);
		assert_eq!(
			tx.recipient(existing).await.unwrap().unwrap().address.pni,
			None
		);
		assert_eq!(
			tx.recipient(resolved).await.unwrap().unwrap().address.aci,
			Some(other)
		);
	}

	#[tokio::test]
	#[traced_test]
	async fn partial_migration_replaces_the_v1_group() {
		let store = store();
		let mut tx = store.begin().await.unwrap();

		let v1_id = GroupIdV1::try_from(&[3; GROUP_ID_V1_LEN][..]).unwrap();
		let mut v1 = tx.get_or_create_group_v1(v1_id).await.unwrap();
		v1.blocked = true;
		tx.update_group(GroupInfo::V1(v1)).await.unwrap();

		let v2 = tx
			.group_or_partial_migrate(v1_id.migrated_master_key())
			.await
			.unwrap();
		assert!(v2.blocked);
		assert!(tx.group(v1_id.into()).await.unwrap().is_none());
		assert!(matches!(
			tx.get_or_create_group_v1(v1_id).await,
			Err(StoreError::GroupMigrated(_))
		));
	}

	#[tokio::test]
	#[traced_test]
	async fn storage_ids_are_assigned_once() {
		let store = store();
		let mut tx = store.begin().await.unwrap();
		let id = tx
			.resolve_recipient(&RecipientAddress::from_aci(aci()))
			.await
			.unwrap();

		let first = tx.storage_id(id, RecordKind::Contact).await.unwrap();
		assert_eq!(first.kind, RecordKind::Contact);
		assert_eq!(tx.storage_id(id, RecordKind::Contact).await.unwrap(), first);
	}
}
