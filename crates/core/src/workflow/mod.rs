//! Proposal review workflow.
//!
//! This module implements the review lifecycle state machine, the orthogonal
//! blocked flag, the edit permission rules and the history trail.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (ReviewStatus, Actor, WorkflowAction)
//! - `error` - Workflow-specific error types
//! - `service` - State transition and permission logic
//! - `history` - History entries appended for every change

pub mod error;
pub mod history;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use history::{HistoryAction, HistoryEntry};
pub use service::WorkflowService;
pub use types::{Actor, ReviewStatus, WorkflowAction};
