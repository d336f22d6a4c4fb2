//! Ceiling guard: caps a unit's Initial-stage commitment.

pub mod error;
pub mod guard;
pub mod lock;

#[cfg(test)]
mod guard_props;

pub use error::CeilingError;
pub use guard::{CeilingCheck, CeilingGuard};
pub use lock::{CeilingLocks, CeilingPermit};
