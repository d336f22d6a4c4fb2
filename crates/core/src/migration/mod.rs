//! Stage migration: carry committed budget of stage k-1 into stage k once.

pub mod error;
pub mod planner;
pub mod service;

#[cfg(test)]
mod planner_props;

pub use error::MigrationError;
pub use planner::{MigrationPlan, MigrationPlanner, MigrationScope};
pub use service::{MigrationReport, MigrationRequest, MigrationService};
