//! Domain layer: records, the access-control gate and family sharing.

pub mod access;
pub mod error;
pub mod family;
pub mod model;
pub mod store;

pub use access::{AccessGate, SessionUser, Tier, TierLimits, Viewer};
pub use error::{AccessError, StoreError};
pub use family::FamilyResolver;
pub use store::RecordStore;
