#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! Reconciliation of remote storage records with an account's local state.
//!
//! A sync pass runs every remote record through a [`RecordProcessor`], which asks the
//! [`MergePolicy`] of the record's kind to validate, match, merge and persist it. The
//! [`StorageSyncManager`] drives whole passes and assembles the writes going the other way.

mod config;
mod context;
mod error;
mod jobs;
mod manager;
pub mod models;
pub mod policy;
mod processor;
mod validation;
mod write_operation;

pub use config::{ConfigError, DeviceRole, SyncConfig, CONFIG_FILE_NAME};
pub use context::PassContext;
pub use error::Error;
pub use jobs::{ChannelJobQueue, Job, JobQueue};
pub use manager::{PassReport, StorageSyncManager};
pub use processor::{assign_identity, MergePolicy, ProcessOutcome, RecordProcessor, RecordUpdate};
pub use validation::{validate, validate_force_push, ValidationError};
pub use write_operation::{create_write_operation, next_manifest_version, WriteOperationResult};
