use crate::{DeviceRole, Job, JobQueue};

use ms_core_account_store::AccountTransaction;
use ms_storage_model::RecipientAddress;

/// Everything a merge policy may touch while a sync pass runs
pub struct PassContext<'a> {
	pub tx: &'a mut dyn AccountTransaction,
	pub jobs: &'a dyn JobQueue,
	pub self_address: &'a RecipientAddress,
	pub device_role: DeviceRole,
}

impl PassContext<'_> {
	#[must_use]
	pub const fn is_primary_device(&self) -> bool {
		self.device_role.is_primary()
	}

	pub fn enqueue(&self, job: Job) {
		self.jobs.enqueue(job);
	}
}
