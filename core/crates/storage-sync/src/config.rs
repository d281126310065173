//! On disk configuration of the storage sync engine.

use ms_utils::error::FileIOError;

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "storage-sync.json";

const DEFAULT_JOB_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("failed to (de)serialize storage sync config: {0}")]
	Serde(#[from] serde_json::Error),
	#[error("unknown storage sync config version: <version={0}>")]
	UnknownVersion(u32),
}

/// Whether this device is the account's primary device or a linked one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceRole {
	#[default]
	Primary,
	Linked,
}

impl DeviceRole {
	#[must_use]
	pub const fn is_primary(self) -> bool {
		matches!(self, Self::Primary)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Config schema version
	pub version: u32,
	pub device_role: DeviceRole,
	/// Jobs that can wait on the queue before new ones are dropped
	#[serde(default = "default_job_queue_capacity")]
	pub job_queue_capacity: usize,
	/// Log both sides of every record that gets updated
	#[serde(default)]
	pub log_record_diffs: bool,
}

const fn default_job_queue_capacity() -> usize {
	DEFAULT_JOB_QUEUE_CAPACITY
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			version: Self::TARGET_VERSION,
			device_role: DeviceRole::default(),
			job_queue_capacity: DEFAULT_JOB_QUEUE_CAPACITY,
			log_record_diffs: false,
		}
	}
}

impl SyncConfig {
	pub const TARGET_VERSION: u32 = 1;

	/// Loads the config from `data_dir`, writing a default one if there is none yet and
	/// migrating older ones in place
	pub fn load_from(data_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = data_dir.as_ref().join(CONFIG_FILE_NAME);

		let json = match fs::read_to_string(&path) {
			Ok(json) => json,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				warn!(path = %path.display(), "No storage sync config found, creating default");
				let config = Self::default();
				config.save_to(data_dir)?;
				return Ok(config);
			}
			Err(e) => return Err(FileIOError::new(&path, e, "read storage sync config").into()),
		};

		let mut config = serde_json::from_str::<Self>(&json)?;
		if config.version < Self::TARGET_VERSION {
			info!(
				from = config.version,
				to = Self::TARGET_VERSION,
				"Migrating storage sync config"
			);
			config.migrate()?;
			config.save_to(data_dir)?;
		} else if config.version > Self::TARGET_VERSION {
			return Err(ConfigError::UnknownVersion(config.version));
		}

		Ok(config)
	}

	pub fn save_to(&self, data_dir: impl AsRef<Path>) -> Result<(), ConfigError> {
		let data_dir = data_dir.as_ref();
		fs::create_dir_all(data_dir)
			.map_err(|e| FileIOError::new(data_dir, e, "create data directory"))?;

		let path = data_dir.join(CONFIG_FILE_NAME);
		fs::write(&path, serde_json::to_vec_pretty(self)?)
			.map_err(|e| FileIOError::new(&path, e, "write storage sync config"))?;

		Ok(())
	}

	fn migrate(&mut self) -> Result<(), ConfigError> {
		while self.version < Self::TARGET_VERSION {
			match self.version {
				// v0 had no job queue capacity, serde already filled in the default
				0 => self.version = 1,
				v => return Err(ConfigError::UnknownVersion(v)),
			}
		}
		Ok(())
	}
}
