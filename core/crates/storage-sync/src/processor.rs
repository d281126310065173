use crate::{Error, PassContext};

use ms_storage_model::{Record, RecordFields, StorageId};

use std::{collections::HashSet, fmt::Debug, hash::Hash};

use async_trait::async_trait;
use tracing::{debug, instrument, trace};

/// Local record being replaced by a merged one
#[derive(Debug, Clone)]
pub struct RecordUpdate<T> {
	pub old: Record<T>,
	pub new: Record<T>,
}

/// Kind specific half of the reconciliation of a remote record with local state
#[async_trait]
pub trait MergePolicy: Send + Sync {
	type Fields: RecordFields + Debug;
	/// Two local records sharing any key describe the same entity
	type Key: Eq + Hash + Debug + Send + Sync;

	async fn is_invalid(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<Self::Fields>,
	) -> Result<bool, Error>;

	/// Exports the local entity `remote` refers to, if there is one
	async fn get_matching(
		&self,
		ctx: &mut PassContext<'_>,
		remote: &Record<Self::Fields>,
	) -> Result<Option<Record<Self::Fields>>, Error>;

	fn merge(
		&self,
		ctx: &PassContext<'_>,
		remote: &Record<Self::Fields>,
		local: &Record<Self::Fields>,
	) -> Self::Fields;

	async fn insert_local(
		&self,
		ctx: &mut PassContext<'_>,
		remote: Record<Self::Fields>,
	) -> Result<(), Error>;

	async fn update_local(
		&self,
		ctx: &mut PassContext<'_>,
		update: RecordUpdate<Self::Fields>,
	) -> Result<(), Error>;

	fn equivalence_keys(&self, record: &Record<Self::Fields>) -> Vec<Self::Key>;
}

/// What happened to a single remote record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
	/// Dropped, it will disappear from the manifest with our next write
	Invalid,
	Inserted,
	/// An earlier record of this pass already claimed the same local entity
	Duplicate,
	Unchanged,
	/// Local state was rewritten and now lives under `id`
	Updated { id: StorageId },
}

/// Runs remote records of one kind through a [`MergePolicy`].
///
/// Keeps the equivalence keys claimed so far, so it must live exactly as long as one
/// sync pass.
pub struct RecordProcessor<P: MergePolicy> {
	policy: P,
	claimed: HashSet<P::Key>,
	log_diffs: bool,
}

impl<P: MergePolicy> RecordProcessor<P> {
	pub fn new(policy: P) -> Self {
		Self {
			policy,
			claimed: HashSet::new(),
			log_diffs: false,
		}
	}

	#[must_use]
	pub const fn with_diff_logging(mut self, log_diffs: bool) -> Self {
		self.log_diffs = log_diffs;
		self
	}

	pub async fn process_all(
		&mut self,
		ctx: &mut PassContext<'_>,
		records: impl IntoIterator<Item = Record<P::Fields>> + Send,
	) -> Result<Vec<ProcessOutcome>, Error> {
		let mut outcomes = Vec::new();
		for record in records {
			outcomes.push(self.process(ctx, record).await?);
		}
		Ok(outcomes)
	}

	#[instrument(skip_all, fields(id = %remote.id), err)]
	pub async fn process(
		&mut self,
		ctx: &mut PassContext<'_>,
		remote: Record<P::Fields>,
	) -> Result<ProcessOutcome, Error> {
		if self.policy.is_invalid(ctx, &remote).await? {
			debug!("Dropping invalid remote record");
			return Ok(ProcessOutcome::Invalid);
		}

		let Some(local) = self.policy.get_matching(ctx, &remote).await? else {
			debug!("No matching local record, inserting");
			self.policy.insert_local(ctx, remote).await?;
			return Ok(ProcessOutcome::Inserted);
		};

		let keys = self.policy.equivalence_keys(&local);
		if keys.iter().any(|key| self.claimed.contains(key)) {
			debug!(local_id = %local.id, "Local record already claimed in this pass, dropping duplicate");
			return Ok(ProcessOutcome::Duplicate);
		}
		self.claimed.extend(keys);

		let merged_fields = self.policy.merge(ctx, &remote, &local);
		let merged = assign_identity(&remote, &local, merged_fields)?;

		if merged.id == local.id && merged.encode()? == local.encode()? {
			trace!("Remote record matches local state");
			return Ok(ProcessOutcome::Unchanged);
		}

		if self.log_diffs {
			debug!(old = ?local.fields, new = ?merged.fields, "Record diff");
		}
		debug!(local_id = %local.id, merged_id = %merged.id, "Updating local record");

		let id = merged.id.clone();
		self.policy
			.update_local(ctx, RecordUpdate { old: local, new: merged })
			.await?;

		Ok(ProcessOutcome::Updated { id })
	}
}

/// Picks the id for a merge result by comparing canonical encodings: the remote id if
/// nothing changed remotely, the local id if nothing changed locally, a fresh one otherwise
pub fn assign_identity<T: RecordFields>(
	remote: &Record<T>,
	local: &Record<T>,
	merged: T,
) -> Result<Record<T>, Error> {
	let encoded = merged.encode()?;

	if encoded == remote.encode()? {
		Ok(Record::new(remote.id.clone(), merged))
	} else if encoded == local.encode()? {
		Ok(Record::new(local.id.clone(), merged))
	} else {
		Ok(Record::with_random_id(merged))
	}
}
