mod mock_account;

use ms_core_account_store::{
	AccountStore, GroupInfo, GroupStore, RecipientStore, SettingsStore, StoreError,
};
use ms_core_storage_sync::{
	models::local_contact_record,
	policy::{ContactPolicy, GroupV2Policy},
	ChannelJobQueue, DeviceRole, Error, Job, MergePolicy, PassContext,
	ProcessOutcome, RecordProcessor, RecordUpdate,
};
use ms_storage_model::{
	AccountRecord, ContactRecord, GroupIdV1, GroupMasterKey, GroupV1Record, GroupV2Record,
	IdentityState, Record, RecordFields, RecordKind, RecordPayload, StorageId, StorageRecord,
	GROUP_ID_V1_LEN,
};

use async_trait::async_trait;
use mock_account::{aci, contact, identity_key, manifest, pni, profile_key, Account, SELF_NUMBER};
use tracing_test::traced_test;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn group_v2(master_key: &[u8]) -> Record<GroupV2Record> {
	Record::new(
		StorageId::random(RecordKind::GroupV2),
		GroupV2Record {
			master_key: master_key.to_vec(),
			..Default::default()
		},
	)
}

#[tokio::test]
#[traced_test]
async fn applying_the_same_records_twice_changes_nothing() -> TestResult {
	let account = Account::new(DeviceRole::Primary);

	let bob = aci();
	let mut bob_record = contact(bob, "+4915100000001");
	bob_record.fields.pni = Some(pni());
	bob_record.fields.given_name = "Bob".to_string();
	bob_record.fields.profile_key = profile_key(1);
	bob_record.fields.identity_key = identity_key(1);
	bob_record.fields.identity_state = IdentityState::Verified;

	let records = vec![
		Record::with_random_id(AccountRecord {
			given_name: "Me".to_string(),
			profile_key: profile_key(2),
			e164: SELF_NUMBER.to_string(),
			..Default::default()
		})
		.into_storage_record(),
		bob_record.clone().into_storage_record(),
		group_v2(&[7; 32]).into_storage_record(),
	];

	let first = account
		.manager
		.apply_remote(&manifest(1, &records), records.clone())
		.await?;
	assert_eq!((first.updated, first.inserted), (2, 1));

	let second = account
		.manager
		.apply_remote(&manifest(2, &records), records)
		.await?;
	assert_eq!((second.updated, second.inserted, second.unchanged), (0, 0, 3));

	let stored = account.contact_by_aci(bob).await.expect("bob was stored");
	assert_eq!(stored.storage_id, Some(bob_record.id));
	assert!(account
		.drain_jobs()
		.iter()
		.any(|job| matches!(job, Job::DownloadProfileAvatar { .. })));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn an_applied_manifest_is_skipped() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let records = vec![contact(aci(), "").into_storage_record()];
	let manifest = manifest(4, &records);

	assert!(!account.manager.apply_remote(&manifest, records.clone()).await?.up_to_date);
	assert!(account.manager.apply_remote(&manifest, records).await?.up_to_date);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn second_record_for_the_same_contact_is_a_duplicate() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let alice = aci();

	let mut first = contact(alice, "");
	first.fields.given_name = "Alice".to_string();
	let mut second = contact(alice, "");
	second.fields.given_name = "Alicia".to_string();

	let records = vec![first.into_storage_record(), second.into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;

	assert_eq!((report.updated, report.duplicate), (1, 1));
	let stored = account.contact_by_aci(alice).await.expect("alice was stored");
	assert_eq!(
		stored.profile.map(|profile| profile.given_name),
		Some("Alice".to_string())
	);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn invalid_contacts_are_dropped() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let self_aci = account.self_address.aci.expect("self has an aci");

	let records = vec![
		contact(self_aci, "").into_storage_record(),
		Record::with_random_id(ContactRecord {
			e164: "+4915100000009".to_string(),
			..Default::default()
		})
		.into_storage_record(),
		contact(aci(), "0049151").into_storage_record(),
	];
	let report = account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;

	assert_eq!(report.invalid, 3);
	assert!(account.contacts().await.is_empty());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn group_v2_follows_the_remote_id() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let master_key = GroupMasterKey::try_from(&[8; 32][..])?;

	let record = group_v2(master_key.as_bytes());
	let records = vec![record.clone().into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;

	let Some(GroupInfo::V2(group)) = account.group(master_key.group_id()).await else {
		panic!("group v2 was not stored");
	};
	assert_eq!(group.storage_id, Some(record.id));

	let mut blocked = group_v2(master_key.as_bytes());
	blocked.fields.blocked = true;
	let records = vec![blocked.clone().into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(2, &records), records)
		.await?;
	assert_eq!(report.updated, 1);

	let Some(GroupInfo::V2(group)) = account.group(master_key.group_id()).await else {
		panic!("group v2 disappeared");
	};
	assert!(group.blocked);
	assert_eq!(group.storage_id, Some(blocked.id));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn diverging_account_gets_a_fresh_id() -> TestResult {
	let account = Account::new(DeviceRole::Primary);

	let local_id = {
		let mut tx = account.store.begin().await?;
		let self_id = tx.self_recipient_id().await?;
		let id = tx.storage_id(self_id, RecordKind::Account).await?;
		account.store.commit(tx).await?;
		id
	};

	// Remote changed a setting, local knows the number
	let remote = Record::with_random_id(AccountRecord {
		read_receipts: true,
		..Default::default()
	});
	let records = vec![remote.clone().into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;
	assert_eq!(report.updated, 1);

	let merged_id = account
		.self_recipient()
		.await
		.storage_id
		.expect("account has a storage id");
	assert_ne!(merged_id, remote.id);
	assert_ne!(merged_id, local_id);

	let tx = account.store.begin().await?;
	assert_eq!(tx.settings().await?.read_receipts, Some(true));
	drop(tx);

	assert!(!account.drain_jobs().contains(&Job::CheckWhoAmI));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn account_flags_from_both_sides_get_a_fresh_id() -> TestResult {
	let account = Account::new(DeviceRole::Primary);

	let first = Record::with_random_id(AccountRecord {
		given_name: "Me".to_string(),
		e164: SELF_NUMBER.to_string(),
		has_viewed_onboarding_story: true,
		..Default::default()
	});
	let records = vec![first.clone().into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;
	let first_id = account
		.self_recipient()
		.await
		.storage_id
		.expect("account has a storage id");

	let second = Record::with_random_id(AccountRecord {
		given_name: "Myself".to_string(),
		e164: SELF_NUMBER.to_string(),
		has_seen_group_story_education_sheet: true,
		..Default::default()
	});
	let records = vec![second.clone().into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(2, &records), records)
		.await?;
	assert_eq!(report.updated, 1);

	let me = account.self_recipient().await;
	let merged_id = me.storage_id.expect("account has a storage id");
	assert_ne!(merged_id, second.id);
	assert_ne!(merged_id, first_id);

	let merged = AccountRecord::decode(&me.storage_record.expect("merged record is stored"))?;
	assert_eq!(merged.given_name, "Myself");
	assert!(merged.has_viewed_onboarding_story);
	assert!(merged.has_seen_group_story_education_sheet);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn group_v1_record_with_a_short_id_is_invalid() -> TestResult {
	let account = Account::new(DeviceRole::Primary);

	let records = vec![Record::with_random_id(GroupV1Record {
		id: vec![1; 5],
		..Default::default()
	})
	.into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;

	assert_eq!((report.invalid, report.inserted), (1, 0));
	let tx = account.store.begin().await?;
	assert!(tx.groups().await?.is_empty());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn undecodable_contact_is_kept_as_unknown() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let bob = aci();

	let broken =
		StorageRecord::from_encoded(StorageId::random(RecordKind::Contact), &[0xc1, 0xff, 0x00]);
	assert!(matches!(broken.payload, RecordPayload::Unknown(_)));

	let records = vec![broken, contact(bob, "+4915100000001").into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;

	assert_eq!((report.unknown, report.updated), (1, 1));
	assert!(account.contact_by_aci(bob).await.is_some());
	assert!(logs_contain("doesn't decode"));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn migrated_group_v1_records_are_invalid() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let v1_id = GroupIdV1::try_from(&[9; GROUP_ID_V1_LEN][..])?;

	let mut tx = account.store.begin().await?;
	tx.group_or_partial_migrate(v1_id.migrated_master_key())
		.await?;
	account.store.commit(tx).await?;

	let records = vec![Record::with_random_id(GroupV1Record {
		id: v1_id.as_bytes().to_vec(),
		..Default::default()
	})
	.into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;

	assert_eq!(report.invalid, 1);
	assert!(account.group(v1_id).await.is_none());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn group_v2_record_partially_migrates_a_v1_group() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let v1_id = GroupIdV1::try_from(&[4; GROUP_ID_V1_LEN][..])?;

	let records = vec![Record::with_random_id(GroupV1Record {
		id: v1_id.as_bytes().to_vec(),
		blocked: true,
		..Default::default()
	})
	.into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;
	assert!(matches!(account.group(v1_id).await, Some(GroupInfo::V1(_))));

	let master_key = v1_id.migrated_master_key();
	let mut migrated = group_v2(master_key.as_bytes());
	migrated.fields.blocked = true;
	let records = vec![migrated.into_storage_record()];
	let report = account
		.manager
		.apply_remote(&manifest(2, &records), records)
		.await?;
	assert_eq!(report.inserted, 1);

	assert!(account.group(v1_id).await.is_none());
	let Some(GroupInfo::V2(group)) = account.group(master_key.group_id()).await else {
		panic!("group v2 was not stored");
	};
	assert!(group.blocked);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn changed_identity_key_requests_a_profile_download() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let carol = aci();

	let mut first = contact(carol, "+4915100000002");
	first.fields.identity_key = identity_key(1);
	let records = vec![first.into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;
	assert!(account.drain_jobs().is_empty());

	let mut second = contact(carol, "+4915100000002");
	second.fields.identity_key = identity_key(2);
	let records = vec![second.into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(2, &records), records)
		.await?;

	assert!(account.drain_jobs().iter().any(
		|job| matches!(job, Job::DownloadProfile { address } if address.aci == Some(carol))
	));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn linked_devices_keep_their_number_pairing() -> TestResult {
	let account = Account::new(DeviceRole::Linked);
	let (dave, dave_pni) = (aci(), pni());

	let mut first = contact(dave, "+4915100000004");
	first.fields.pni = Some(dave_pni);
	let records = vec![first.into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;
	assert!(account.drain_jobs().is_empty());

	let mut second = contact(dave, "+4915100000005");
	second.fields.pni = Some(dave_pni);
	let records = vec![second.into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(2, &records), records)
		.await?;

	assert!(account.drain_jobs().contains(&Job::RefreshRecipients));
	let stored = account.contact_by_aci(dave).await.expect("dave was stored");
	assert_eq!(stored.address.number.as_deref(), Some("+4915100000004"));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn exported_contact_merges_back_unchanged() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let frank = aci();

	let mut record = contact(frank, "+4915100000006");
	record.fields.given_name = "Frank".to_string();
	record.fields.profile_key = profile_key(6);
	let records = vec![record.into_storage_record()];
	account
		.manager
		.apply_remote(&manifest(1, &records), records)
		.await?;

	let recipient_id = account.contact_by_aci(frank).await.expect("frank was stored").id;
	let (jobs, _rx) = ChannelJobQueue::new(8);
	let mut tx = account.store.begin().await?;
	let exported = local_contact_record(&mut tx, recipient_id)
		.await?
		.expect("frank has a projection");

	let mut ctx = PassContext {
		tx: &mut tx,
		jobs: &jobs,
		self_address: &account.self_address,
		device_role: DeviceRole::Primary,
	};
	let outcome = RecordProcessor::new(ContactPolicy)
		.process(&mut ctx, exported)
		.await?;
	assert_eq!(outcome, ProcessOutcome::Unchanged);

	Ok(())
}

/// Stores the group like the real policy does, then fails
struct FailingAfterWrite(GroupV2Policy);

#[async_trait]
impl MergePolicy for FailingAfterWrite {
	type Fields = GroupV2Record;
	type Key = Vec<u8>;

	async fn is_invalid(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<GroupV2Record>,
	) -> Result<bool, Error> {
		self.0.is_invalid(ctx, remote).await
	}

	async fn get_matching(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<GroupV2Record>,
	) -> Result<Option<Record<GroupV2Record>>, Error> {
		self.0.get_matching(ctx, remote).await
	}

	fn merge(
		&self,
		ctx: &PassContext<'_>,
		remote: &Record<GroupV2Record>,
		local: &Record<GroupV2Record>,
	) -> GroupV2Record {
		self.0.merge(ctx, remote, local)
	}

	async fn insert_local(
		&self,
		ctx: &mut PassContext<'_>,
		remote: Record<GroupV2Record>,
	) -> Result<(), Error> {
		self.0.insert_local(ctx, remote).await?;
		Err(StoreError::Backend("disk full".into()).into())
	}

	async fn update_local(
		&self,
		ctx: &mut PassContext<'_>,
		update: RecordUpdate<GroupV2Record>,
	) -> Result<(), Error> {
		self.0.update_local(ctx, update).await
	}

	fn equivalence_keys(&self, record: &Record<GroupV2Record>) -> Vec<Vec<u8>> {
		self.0.equivalence_keys(record)
	}
}

#[tokio::test]
#[traced_test]
async fn failed_pass_leaves_no_trace() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let master_key = GroupMasterKey::try_from(&[5; 32][..])?;
	let (jobs, _rx) = ChannelJobQueue::new(8);

	{
		let mut tx = account.store.begin().await?;
		let mut ctx = PassContext {
			tx: &mut tx,
			jobs: &jobs,
			self_address: &account.self_address,
			device_role: DeviceRole::Primary,
		};

		let mut processor = RecordProcessor::new(FailingAfterWrite(GroupV2Policy));
		let result = processor
			.process(&mut ctx, group_v2(master_key.as_bytes()))
			.await;

		assert!(matches!(&result, Err(e) if !e.is_invariant_violation()));
		assert_eq!(ctx.tx.groups().await?.len(), 1);
	}

	assert!(account.group(master_key.group_id()).await.is_none());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn processor_reports_each_outcome() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let master_key = GroupMasterKey::try_from(&[6; 32][..])?;
	let (jobs, _rx) = ChannelJobQueue::new(8);

	let mut tx = account.store.begin().await?;
	let mut ctx = PassContext {
		tx: &mut tx,
		jobs: &jobs,
		self_address: &account.self_address,
		device_role: DeviceRole::Primary,
	};

	let record = group_v2(master_key.as_bytes());
	let outcomes = RecordProcessor::new(GroupV2Policy)
		.process_all(
			&mut ctx,
			[
				group_v2(&[1; 3]),
				record.clone(),
				record.clone(),
			],
		)
		.await?;
	assert_eq!(
		outcomes,
		[ProcessOutcome::Invalid, ProcessOutcome::Inserted, ProcessOutcome::Unchanged]
	);

	// A fresh pass no longer remembers what the previous one claimed
	let mut renamed = record;
	renamed.id = StorageId::random(RecordKind::GroupV2);
	let outcome = RecordProcessor::new(GroupV2Policy)
		.process(&mut ctx, renamed.clone())
		.await?;
	assert_eq!(outcome, ProcessOutcome::Updated { id: renamed.id });

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn prepared_writes_carry_local_changes_and_unknown_ids() -> TestResult {
	let account = Account::new(DeviceRole::Primary);

	let bob = contact(aci(), "+4915100000003").into_storage_record();
	let unknown = StorageRecord {
		id: StorageId::random(RecordKind::Unknown(99)),
		payload: RecordPayload::Unknown(vec![1, 2, 3]),
	};
	let records = vec![
		Record::with_random_id(AccountRecord {
			e164: SELF_NUMBER.to_string(),
			..Default::default()
		})
		.into_storage_record(),
		bob.clone(),
		unknown.clone(),
	];
	let remote = manifest(5, &records);
	let report = account.manager.apply_remote(&remote, records).await?;
	assert_eq!(report.unknown, 1);

	// A group created locally since the last sync
	let master_key = GroupMasterKey::try_from(&[3; 32][..])?;
	let mut tx = account.store.begin().await?;
	tx.group_or_partial_migrate(master_key).await?;
	account.store.commit(tx).await?;

	let write = account.manager.prepare_write(&remote, false).await?;
	assert_eq!(write.manifest.version, 6);
	assert!(write.manifest.contains_raw(unknown.id.raw()));
	assert!(write.manifest.contains_raw(bob.id.raw()));
	assert!(write.deletes.is_empty());
	assert_eq!(write.inserts.len(), 1);
	assert_eq!(write.inserts[0].kind(), RecordKind::GroupV2);

	account.manager.mark_uploaded(&write.manifest).await?;
	assert!(account
		.manager
		.prepare_write(&write.manifest, false)
		.await?
		.is_empty());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn force_push_replaces_every_id() -> TestResult {
	let account = Account::new(DeviceRole::Primary);
	let erin = aci();

	let unknown = StorageRecord {
		id: StorageId::random(RecordKind::Unknown(42)),
		payload: RecordPayload::Unknown(vec![4, 2]),
	};
	let records = vec![contact(erin, "").into_storage_record(), unknown.clone()];
	let remote = manifest(9, &records);
	account.manager.apply_remote(&remote, records).await?;

	let push = account.manager.prepare_force_push(&remote).await?;
	assert_eq!(push.manifest.version, 10);
	assert_eq!(push.deletes.len(), remote.ids.len());
	assert_eq!(push.inserts.len(), push.manifest.ids.len());
	assert!(!push.manifest.contains_raw(unknown.id.raw()));
	assert!(push
		.inserts
		.iter()
		.all(|insert| !remote.contains_raw(insert.id.raw())));

	let stored = account.contact_by_aci(erin).await.expect("erin was stored");
	assert!(push
		.manifest
		.ids
		.contains(&stored.storage_id.expect("erin has a storage id")));

	Ok(())
}
