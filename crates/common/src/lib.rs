//! Shared types used across the identity write core.

pub mod principal;
pub mod types;

pub use principal::ActingPrincipal;
pub use types::{EntityId, PrincipalId};
