//! Delivery hub
//!
//! One actor task owns the [`MembershipRegistry`](crate::registry::MembershipRegistry)
//! and processes commands in arrival order. [`Hub`] is the cloneable handle
//! everything else talks to.

mod actor;
mod delivery;
mod error;
mod handle;
mod services;

pub use delivery::{DeliveryReport, HubStats, OutboundEvent};
pub use error::{AdmitError, BuildError, HubError, InboundError, NotifyError};
pub use handle::{Hub, ServedConnection};
pub use services::{DeliveryServices, DeliveryServicesBuilder};
