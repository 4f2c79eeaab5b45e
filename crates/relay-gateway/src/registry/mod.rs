//! Membership registry
//!
//! Room and user indexes over live connections. Owned by the hub actor.

mod membership;

pub use membership::{MembershipRegistry, RegistryError};
