use std::{fmt::Display, path::Path};

use thiserror::Error;

/// File I/O error carrying the path it happened on
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: std::io::Error,
	pub context: Option<&'static str>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "file I/O error")?;
		if let Some(context) = self.context {
			write!(f, " ({context})")?;
		}
		write!(f, ": {}; <path='{}'>", self.source, self.path.display())
	}
}

impl FileIOError {
	pub fn new(path: impl AsRef<Path>, source: std::io::Error, context: &'static str) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			context: Some(context),
		}
	}
}

impl<P: AsRef<Path>> From<(P, std::io::Error)> for FileIOError {
	fn from((path, source): (P, std::io::Error)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			context: None,
		}
	}
}
