use crate::{
	create_write_operation, next_manifest_version,
	models::{
		local_account_record, local_contact_record, local_group_v1_record, local_group_v2_record,
	},
	policy::{AccountPolicy, ContactPolicy, GroupV1Policy, GroupV2Policy},
	validate, validate_force_push, ChannelJobQueue, Error, Job, JobQueue, MergePolicy,
	PassContext, ProcessOutcome, RecordProcessor, SyncConfig, WriteOperationResult,
};

use ms_core_account_store::{
	AccountStore, AccountTransaction, GroupInfo, RecipientStore, SettingsStore, StoreError,
	UnknownStorageIdStore,
};
use ms_storage_model::{
	AccountRecord, ContactRecord, GroupV1Record, GroupV2Record, Manifest, RecipientAddress,
	Record, RecordKind, RecordPayload, StorageId, StorageRecord,
};

use std::{collections::HashSet, fmt, sync::Arc};

use async_channel::Receiver;
use tracing::{debug, info, instrument, warn};

/// Tally of what a sync pass did with the remote records it was given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
	/// The remote manifest was already applied, nothing was processed
	pub up_to_date: bool,
	pub inserted: usize,
	pub updated: usize,
	pub unchanged: usize,
	pub invalid: usize,
	pub duplicate: usize,
	pub unknown: usize,
}

impl PassReport {
	fn record(&mut self, outcomes: &[ProcessOutcome]) {
		for outcome in outcomes {
			match outcome {
				ProcessOutcome::Invalid => self.invalid += 1,
				ProcessOutcome::Inserted => self.inserted += 1,
				ProcessOutcome::Duplicate => self.duplicate += 1,
				ProcessOutcome::Unchanged => self.unchanged += 1,
				ProcessOutcome::Updated { .. } => self.updated += 1,
			}
		}
	}
}

impl fmt::Display for PassReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.up_to_date {
			return write!(f, "<up_to_date>");
		}

		write!(
			f,
			"<inserted={}, updated={}, unchanged={}, invalid={}, duplicate={}, unknown={}>",
			self.inserted,
			self.updated,
			self.unchanged,
			self.invalid,
			self.duplicate,
			self.unknown
		)
	}
}

#[derive(Default)]
struct RecordsByKind {
	accounts: Vec<Record<AccountRecord>>,
	contacts: Vec<Record<ContactRecord>>,
	groups_v1: Vec<Record<GroupV1Record>>,
	groups_v2: Vec<Record<GroupV2Record>>,
	unknown: Vec<StorageId>,
	mismatched: usize,
}

impl RecordsByKind {
	fn split(records: Vec<StorageRecord>) -> Self {
		let mut split = Self::default();

		for StorageRecord { id, payload } in records {
			match (id.kind, payload) {
				(RecordKind::Account, RecordPayload::Account(fields)) => {
					split.accounts.push(Record::new(id, fields));
				}
				(RecordKind::Contact, RecordPayload::Contact(fields)) => {
					split.contacts.push(Record::new(id, fields));
				}
				(RecordKind::GroupV1, RecordPayload::GroupV1(fields)) => {
					split.groups_v1.push(Record::new(id, fields));
				}
				(RecordKind::GroupV2, RecordPayload::GroupV2(fields)) => {
					split.groups_v2.push(Record::new(id, fields));
				}
				(_, RecordPayload::Unknown(_)) => split.unknown.push(id),
				(_, payload) => {
					warn!(
						%id,
						payload_kind = ?payload.kind(),
						"Record payload doesn't match the kind of its id, dropping it"
					);
					split.mismatched += 1;
				}
			}
		}

		split
	}
}

/// Drives sync passes of one account: applies remote manifests to local state and
/// assembles the writes that bring the remote side up to date.
pub struct StorageSyncManager<S> {
	store: S,
	config: SyncConfig,
	jobs: Arc<dyn JobQueue>,
}

impl<S: AccountStore> StorageSyncManager<S> {
	pub fn new(store: S, config: SyncConfig, jobs: Arc<dyn JobQueue>) -> Self {
		Self {
			store,
			config,
			jobs,
		}
	}

	/// Creates a manager enqueuing its jobs on a channel sized by the config
	pub fn with_channel_jobs(store: S, config: SyncConfig) -> (Self, Receiver<Job>) {
		let (jobs, rx) = ChannelJobQueue::new(config.job_queue_capacity);
		(Self::new(store, config, Arc::new(jobs)), rx)
	}

	pub const fn store(&self) -> &S {
		&self.store
	}

	pub const fn config(&self) -> &SyncConfig {
		&self.config
	}

	async fn load_self_address(tx: &S::Transaction) -> Result<RecipientAddress, Error> {
		let self_id = tx.self_recipient_id().await?;
		tx.recipient(self_id)
			.await?
			.map(|recipient| recipient.address)
			.ok_or_else(|| StoreError::RecipientNotFound(self_id).into())
	}

	async fn run<P: MergePolicy>(
		&self,
		ctx: &mut PassContext<'_>,
		policy: P,
		records: Vec<Record<P::Fields>>,
		report: &mut PassReport,
	) -> Result<(), Error> {
		let mut processor = RecordProcessor::new(policy).with_diff_logging(self.config.log_record_diffs);
		report.record(&processor.process_all(ctx, records).await?);
		Ok(())
	}

	/// Merges a remote manifest and its records into local state, in a single transaction.
	///
	/// Any error rolls back everything the pass wrote.
	#[instrument(skip_all, fields(version = manifest.version), err)]
	pub async fn apply_remote(
		&self,
		manifest: &Manifest,
		records: Vec<StorageRecord>,
	) -> Result<PassReport, Error> {
		let mut tx = self.store.begin().await?;

		if tx.storage_manifest_version().await? == manifest.version {
			debug!("Remote manifest already applied");
			return Ok(PassReport {
				up_to_date: true,
				..Default::default()
			});
		}

		let self_address = Self::load_self_address(&tx).await?;
		let split = RecordsByKind::split(records);
		let mut report = PassReport {
			invalid: split.mismatched,
			unknown: split.unknown.len(),
			..Default::default()
		};

		let mut ctx = PassContext {
			tx: &mut tx,
			jobs: &*self.jobs,
			self_address: &self_address,
			device_role: self.config.device_role,
		};

		// The account goes first, contacts are checked against our own identifiers
		if !split.accounts.is_empty() {
			let policy = AccountPolicy::load(&mut ctx).await?;
			self.run(&mut ctx, policy, split.accounts, &mut report).await?;
		}
		self.run(&mut ctx, ContactPolicy, split.contacts, &mut report)
			.await?;
		self.run(&mut ctx, GroupV1Policy, split.groups_v1, &mut report)
			.await?;
		self.run(&mut ctx, GroupV2Policy, split.groups_v2, &mut report)
			.await?;

		let manifest_raw_ids = manifest.raw_ids();
		let stale_unknown = ctx
			.tx
			.unknown_storage_ids()
			.await?
			.into_iter()
			.filter(|id| !manifest_raw_ids.contains(id.raw()))
			.map(|id| id.raw)
			.collect::<Vec<_>>();
		ctx.tx.delete_unknown_storage_ids(&stale_unknown).await?;
		ctx.tx.add_unknown_storage_ids(split.unknown).await?;
		ctx.tx.set_storage_manifest_version(manifest.version).await?;

		self.store.commit(tx).await?;

		info!(%report, "Applied remote storage manifest");
		Ok(report)
	}

	/// Assembles the incremental write that makes the remote side match local state
	#[instrument(skip_all, fields(previous_version = previous.version), err)]
	pub async fn prepare_write(
		&self,
		previous: &Manifest,
		force_push_pending: bool,
	) -> Result<WriteOperationResult, Error> {
		let mut tx = self.store.begin().await?;
		let self_address = Self::load_self_address(&tx).await?;

		let records = export_local_records(&mut tx).await?;
		let ids = records
			.iter()
			.map(|record| record.id.clone())
			.chain(tx.unknown_storage_ids().await?)
			.collect();

		let result = create_write_operation(previous, ids, records)?;
		validate(&result, previous, force_push_pending, &self_address)?;

		// Keeps the storage ids minted while exporting
		self.store.commit(tx).await?;

		debug!(%result, "Prepared storage write");
		Ok(result)
	}

	/// Assembles a write replacing the whole remote state: every local record gets a fresh
	/// id and everything in `previous` is deleted
	#[instrument(skip_all, fields(previous_version = previous.version), err)]
	pub async fn prepare_force_push(
		&self,
		previous: &Manifest,
	) -> Result<WriteOperationResult, Error> {
		let mut tx = self.store.begin().await?;
		let self_address = Self::load_self_address(&tx).await?;

		rekey_local_records(&mut tx).await?;

		// Records we can't read can't be re-uploaded either
		let unknown = tx
			.unknown_storage_ids()
			.await?
			.into_iter()
			.map(|id| id.raw)
			.collect::<Vec<_>>();
		tx.delete_unknown_storage_ids(&unknown).await?;

		let version = next_manifest_version(previous)?;
		let inserts = export_local_records(&mut tx).await?;
		let result = WriteOperationResult {
			manifest: Manifest::new(
				version,
				inserts.iter().map(|record| record.id.clone()).collect(),
			),
			inserts,
			deletes: previous.ids.iter().map(|id| id.raw.clone()).collect(),
		};
		validate_force_push(&result.manifest, &result.inserts, &self_address)?;

		self.store.commit(tx).await?;

		info!(%result, "Prepared storage force push");
		Ok(result)
	}

	/// Remembers that `manifest` is now what the storage service holds
	pub async fn mark_uploaded(&self, manifest: &Manifest) -> Result<(), Error> {
		let mut tx = self.store.begin().await?;
		tx.set_storage_manifest_version(manifest.version).await?;
		self.store.commit(tx).await?;
		Ok(())
	}
}

async fn export_local_records(
	tx: &mut dyn AccountTransaction,
) -> Result<Vec<StorageRecord>, Error> {
	let mut records = vec![local_account_record(tx).await?.into_storage_record()];

	for recipient_id in tx.contact_recipient_ids().await? {
		if let Some(record) = local_contact_record(tx, recipient_id).await? {
			records.push(record.into_storage_record());
		}
	}

	for group in tx.groups().await? {
		let storage_id = tx.group_storage_id(group.id()).await?;
		records.push(match &group {
			GroupInfo::V1(group) => local_group_v1_record(group, storage_id).into_storage_record(),
			GroupInfo::V2(group) => local_group_v2_record(group, storage_id).into_storage_record(),
		});
	}

	let mut seen = HashSet::new();
	records.retain(|record| {
		let fresh = seen.insert(record.id.raw.clone());
		if !fresh {
			warn!(id = %record.id, "Two local entities share a storage id, exporting only one");
		}
		fresh
	});

	Ok(records)
}

async fn rekey_local_records(tx: &mut dyn AccountTransaction) -> Result<(), Error> {
	let self_id = tx.self_recipient_id().await?;
	tx.set_storage_id(self_id, StorageId::random(RecordKind::Account))
		.await?;

	for recipient_id in tx.contact_recipient_ids().await? {
		tx.set_storage_id(recipient_id, StorageId::random(RecordKind::Contact))
			.await?;
	}

	for group in tx.groups().await? {
		let kind = match group {
			GroupInfo::V1(_) => RecordKind::GroupV1,
			GroupInfo::V2(_) => RecordKind::GroupV2,
		};
		tx.set_group_storage_id(group.id(), StorageId::random(kind))
			.await?;
	}

	Ok(())
}
