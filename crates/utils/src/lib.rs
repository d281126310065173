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

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

pub mod error;

/// Returns `Some` only for non-empty byte-like values, so empty strings and
/// empty byte vectors can be treated as "unset"
pub fn non_empty<T: AsRef<[u8]> + ?Sized>(value: &T) -> Option<&T> {
	if value.as_ref().is_empty() {
		None
	} else {
		Some(value)
	}
}

/// Picks `preferred` unless it is empty, falling back to `fallback`
pub fn first_non_empty<T: AsRef<[u8]> + Clone>(preferred: &T, fallback: &T) -> T {
	non_empty(preferred).unwrap_or(fallback).clone()
}

/// Renders an opaque identifier the way it shows up in logs
pub fn to_base64(bytes: impl AsRef<[u8]>) -> String {
	STANDARD.encode(bytes)
}

pub fn random_bytes<const N: usize>() -> [u8; N] {
	let mut bytes = [0; N];
	rand::thread_rng().fill_bytes(&mut bytes);
	bytes
}
