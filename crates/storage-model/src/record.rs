use crate::{
	AccountRecord, ContactRecord, Error, GroupV1Record, GroupV2Record, RecordKind, StorageId,
	UnknownFields,
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Payload of a storage record, one variant per kind this client understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
	Account(AccountRecord),
	Contact(ContactRecord),
	GroupV1(GroupV1Record),
	GroupV2(GroupV2Record),
	/// Kinds we don't understand (story distribution lists, call links, future kinds),
	/// kept as the opaque bytes they arrived as
	Unknown(Vec<u8>),
}

impl RecordPayload {
	#[must_use]
	pub const fn kind(&self) -> Option<RecordKind> {
		match self {
			Self::Account(_) => Some(AccountRecord::KIND),
			Self::Contact(_) => Some(ContactRecord::KIND),
			Self::GroupV1(_) => Some(GroupV1Record::KIND),
			Self::GroupV2(_) => Some(GroupV2Record::KIND),
			Self::Unknown(_) => None,
		}
	}
}

/// A record as it is stored on, or uploaded to, the storage service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRecord {
	pub id: StorageId,
	pub payload: RecordPayload,
}

impl StorageRecord {
	#[must_use]
	pub const fn kind(&self) -> RecordKind {
		self.id.kind
	}

	/// Decodes a raw payload received from the service according to the id's kind.
	///
	/// Kinds without a typed payload, and payloads that don't decode, stay
	/// [`RecordPayload::Unknown`].
	#[must_use]
	pub fn from_encoded(id: StorageId, bytes: &[u8]) -> Self {
		let payload = match id.kind {
			RecordKind::Account => decode_or_unknown::<AccountRecord>(&id, bytes),
			RecordKind::Contact => decode_or_unknown::<ContactRecord>(&id, bytes),
			RecordKind::GroupV1 => decode_or_unknown::<GroupV1Record>(&id, bytes),
			RecordKind::GroupV2 => decode_or_unknown::<GroupV2Record>(&id, bytes),
			RecordKind::StoryDistributionList | RecordKind::CallLink | RecordKind::Unknown(_) => {
				RecordPayload::Unknown(bytes.to_vec())
			}
		};

		Self { id, payload }
	}

	pub fn encode(&self) -> Result<Vec<u8>, Error> {
		match &self.payload {
			RecordPayload::Account(fields) => fields.encode(),
			RecordPayload::Contact(fields) => fields.encode(),
			RecordPayload::GroupV1(fields) => fields.encode(),
			RecordPayload::GroupV2(fields) => fields.encode(),
			RecordPayload::Unknown(bytes) => Ok(bytes.clone()),
		}
	}

}

fn decode_or_unknown<T: RecordFields>(id: &StorageId, bytes: &[u8]) -> RecordPayload {
	T::decode(bytes).map_or_else(
		|e| {
			warn!(%id, ?e, "Storage record payload doesn't decode, keeping it as unknown");
			RecordPayload::Unknown(bytes.to_vec())
		},
		T::into_payload,
	)
}

/// Payload types with a canonical encoding.
///
/// `encode` is deterministic: equal values always give equal bytes, and byte equality is
/// the only equality the sync engine uses when deciding which id a merged record keeps.
pub trait RecordFields:
	Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
	const KIND: RecordKind;

	fn into_payload(self) -> RecordPayload;

	fn from_payload(payload: RecordPayload) -> Option<Self>;

	fn unknown_fields(&self) -> &UnknownFields;

	fn encode(&self) -> Result<Vec<u8>, Error> {
		rmp_serde::to_vec(self).map_err(Into::into)
	}

	fn decode(bytes: &[u8]) -> Result<Self, Error> {
		rmp_serde::from_slice(bytes).map_err(Into::into)
	}
}

macro_rules! impl_record_fields {
	($fields:ty, $kind:ident) => {
		impl RecordFields for $fields {
			const KIND: RecordKind = RecordKind::$kind;

			fn into_payload(self) -> RecordPayload {
				RecordPayload::$kind(self)
			}

			fn from_payload(payload: RecordPayload) -> Option<Self> {
				match payload {
					RecordPayload::$kind(fields) => Some(fields),
					_ => None,
				}
			}

			fn unknown_fields(&self) -> &UnknownFields {
				&self.unknown_fields
			}
		}
	};
}

impl_record_fields!(AccountRecord, Account);
impl_record_fields!(ContactRecord, Contact);
impl_record_fields!(GroupV1Record, GroupV1);
impl_record_fields!(GroupV2Record, GroupV2);

/// A typed record: payload fields plus the id they are stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<T> {
	pub id: StorageId,
	pub fields: T,
}

impl<T: RecordFields> Record<T> {
	pub const fn new(id: StorageId, fields: T) -> Self {
		Self { id, fields }
	}

	/// Wraps fields under a freshly minted random id
	pub fn with_random_id(fields: T) -> Self {
		Self::new(StorageId::random(T::KIND), fields)
	}

	pub fn encode(&self) -> Result<Vec<u8>, Error> {
		self.fields.encode()
	}

	pub fn into_storage_record(self) -> StorageRecord {
		StorageRecord {
			id: self.id,
			payload: self.fields.into_payload(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use tracing_test::traced_test;

	#[test]
	fn encoding_is_canonical() {
		let mut contact = ContactRecord {
			e164: "+4915100000000".into(),
			given_name: "Ada".into(),
			unknown_fields: UnknownFields(vec![1, 2, 3]),
			..Default::default()
		};

		let first = contact.encode().expect("encodes");
		assert_eq!(first, contact.clone().encode().expect("encodes"));
		assert_eq!(ContactRecord::decode(&first).expect("decodes"), contact);

		contact.archived = true;
		assert_ne!(first, contact.encode().expect("encodes"));
	}

	#[test]
	fn unknown_kinds_keep_their_bytes() {
		let id = StorageId::random(RecordKind::CallLink);
		let record = StorageRecord::from_encoded(id, &[9, 9, 9]);
		assert_eq!(record.payload, RecordPayload::Unknown(vec![9, 9, 9]));
		assert_eq!(record.encode().expect("opaque payload"), vec![9, 9, 9]);
	}

	#[test]
	#[traced_test]
	fn undecodable_payloads_become_unknown() {
		let id = StorageId::random(RecordKind::Contact);
		let record = StorageRecord::from_encoded(id.clone(), &[0xc1, 0xff, 0x00]);
		assert_eq!(record.id, id);
		assert_eq!(record.payload, RecordPayload::Unknown(vec![0xc1, 0xff, 0x00]));
		assert!(logs_contain("doesn't decode"));

		let contact = ContactRecord {
			given_name: "Ada".into(),
			..Default::default()
		};
		let id = StorageId::random(RecordKind::Contact);
		let record = StorageRecord::from_encoded(id, &contact.encode().expect("encodes"));
		assert_eq!(record.payload, RecordPayload::Contact(contact));
	}
}
