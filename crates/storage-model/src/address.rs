use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account identifier of a user, stable across phone number changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aci(Uuid);

/// Phone number identifier, tied to the number a user currently has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pni(Uuid);

impl Aci {
	#[must_use]
	pub const fn from_uuid(uuid: Uuid) -> Self {
		Self(uuid)
	}

	#[must_use]
	pub const fn uuid(&self) -> Uuid {
		self.0
	}

	/// The nil uuid is what an unset service id decodes to
	#[must_use]
	pub fn is_valid(&self) -> bool {
		!self.0.is_nil()
	}
}

impl Pni {
	#[must_use]
	pub const fn from_uuid(uuid: Uuid) -> Self {
		Self(uuid)
	}

	#[must_use]
	pub const fn uuid(&self) -> Uuid {
		self.0
	}

	#[must_use]
	pub fn is_valid(&self) -> bool {
		!self.0.is_nil()
	}
}

impl fmt::Display for Aci {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl fmt::Display for Pni {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PNI:{}", self.0)
	}
}

/// Every identifier known for a recipient. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientAddress {
	pub aci: Option<Aci>,
	pub pni: Option<Pni>,
	pub number: Option<String>,
	pub username: Option<String>,
}

impl RecipientAddress {
	/// Builds an address from raw record fields, dropping nil service ids and empty strings
	#[must_use]
	pub fn from_parts(aci: Option<Aci>, pni: Option<Pni>, number: &str, username: &str) -> Self {
		Self {
			aci: aci.filter(Aci::is_valid),
			pni: pni.filter(Pni::is_valid),
			number: (!number.is_empty()).then(|| number.to_string()),
			username: (!username.is_empty()).then(|| username.to_string()),
		}
	}

	#[must_use]
	pub fn from_aci(aci: Aci) -> Self {
		Self {
			aci: Some(aci),
			..Default::default()
		}
	}

	/// Two addresses match when they share an aci, a pni or a phone number
	#[must_use]
	pub fn matches(&self, other: &Self) -> bool {
		fn same<T: PartialEq>(a: Option<&T>, b: Option<&T>) -> bool {
			matches!((a, b), (Some(a), Some(b)) if a == b)
		}

		same(self.aci.as_ref(), other.aci.as_ref())
			|| same(self.pni.as_ref(), other.pni.as_ref())
			|| same(self.number.as_ref(), other.number.as_ref())
	}

	#[must_use]
	pub const fn has_service_id(&self) -> bool {
		self.aci.is_some() || self.pni.is_some()
	}

	#[must_use]
	pub fn number_or_empty(&self) -> &str {
		self.number.as_deref().unwrap_or_default()
	}
}

impl fmt::Display for RecipientAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<")?;
		let mut sep = "";
		if let Some(aci) = &self.aci {
			write!(f, "aci='{aci}'")?;
			sep = ", ";
		}
		if let Some(pni) = &self.pni {
			write!(f, "{sep}pni='{pni}'")?;
			sep = ", ";
		}
		if let Some(number) = &self.number {
			write!(f, "{sep}number='{number}'")?;
		}
		write!(f, ">")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn addresses_match_on_any_shared_identifier() {
		let aci = Aci::from_uuid(Uuid::new_v4());
		let pni = Pni::from_uuid(Uuid::new_v4());

		let by_aci = RecipientAddress::from_aci(aci);
		let by_pni = RecipientAddress::from_parts(None, Some(pni), "+4915100000000", "");
		let both = RecipientAddress::from_parts(Some(aci), Some(pni), "", "");

		assert!(by_aci.matches(&both));
		assert!(by_pni.matches(&both));
		assert!(!by_aci.matches(&by_pni));
		assert!(!RecipientAddress::default().matches(&RecipientAddress::default()));
	}

	#[test]
	fn nil_service_ids_are_dropped() {
		let address = RecipientAddress::from_parts(
			Some(Aci::from_uuid(Uuid::nil())),
			Some(Pni::from_uuid(Uuid::nil())),
			"",
			"",
		);
		assert!(!address.has_service_id());
		assert_eq!(address.number, None);
	}
}
