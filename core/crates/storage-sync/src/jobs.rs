use ms_storage_model::RecipientAddress;

use async_channel::{Receiver, Sender, TrySendError};
use strum_macros::AsRefStr;
use tracing::{trace, warn};

/// Follow-up work a sync pass asks for, run outside of it
#[derive(Debug, Clone, PartialEq, Eq, AsRefStr)]
pub enum Job {
	/// Our own number changed on another device
	CheckWhoAmI,
	DownloadProfileAvatar { avatar_path: String },
	DownloadProfile { address: RecipientAddress },
	RefreshRecipients,
}

/// Fire-and-forget sink for [`Job`]s. Enqueuing never blocks and never fails the pass.
pub trait JobQueue: Send + Sync {
	fn enqueue(&self, job: Job);
}

/// [`JobQueue`] over a bounded channel, dropping jobs when it is full
#[derive(Debug, Clone)]
pub struct ChannelJobQueue {
	tx: Sender<Job>,
}

impl ChannelJobQueue {
	#[must_use]
	pub fn new(capacity: usize) -> (Self, Receiver<Job>) {
		let (tx, rx) = async_channel::bounded(capacity.max(1));
		(Self { tx }, rx)
	}
}

impl JobQueue for ChannelJobQueue {
	fn enqueue(&self, job: Job) {
		trace!(job = job.as_ref(), "Enqueuing job");
		match self.tx.try_send(job) {
			Ok(()) => {}
			Err(TrySendError::Full(job)) => {
				warn!(job = job.as_ref(), "Job queue is full, dropping job");
			}
			Err(TrySendError::Closed(job)) => {
				warn!(job = job.as_ref(), "Job queue is closed, dropping job");
			}
		}
	}
}
