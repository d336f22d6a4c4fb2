//! Stage resolution.
//!
//! A budget cycle runs through an Initial stage followed by numbered
//! Revision stages. Every stage owns one physical storage location; this
//! module turns labels into typed [`Stage`] values and stages into locations.

pub mod error;
pub mod table;
pub mod types;

pub use error::StageError;
pub use table::{StageLocation, StageTable};
pub use types::{MAX_REVISION, Stage};
