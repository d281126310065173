//! Merge policies, one per record kind the engine reconciles.

mod account;
mod contact;
mod group_v1;
mod group_v2;

pub use account::AccountPolicy;
pub use contact::{ContactKey, ContactPolicy};
pub use group_v1::GroupV1Policy;
pub use group_v2::GroupV2Policy;
