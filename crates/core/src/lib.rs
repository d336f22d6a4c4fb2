//! Core budget revision logic for Pagu.
//!
//! This crate holds the domain rules with no web or SQL code. Storage is
//! reached through the [`store::ProposalStore`] trait.
//!
//! # Modules
//!
//! - `stage` - Initial and numbered revision stages, stage-to-table lookup
//! - `proposal` - Proposal records, input validation, monthly amounts
//! - `workflow` - Review state machine, permissions, history entries
//! - `ceiling` - Initial-stage ceiling enforcement
//! - `lineage` - Links between a record and the one it supersedes
//! - `migration` - Carrying committed records into the next stage
//! - `summary` - Per-unit and portfolio rollups
//! - `variance` - Before/after matrix across adjacent stages
//! - `recap` - Realization recap by classification
//! - `context` - Cycle settings and the cached unit list
//! - `store` - Storage trait and the in-memory store
//! - `engine` - The operations exposed to callers

pub mod ceiling;
pub mod context;
pub mod engine;
pub mod error;
pub mod lineage;
pub mod migration;
pub mod proposal;
pub mod recap;
pub mod stage;
pub mod store;
pub mod summary;
pub mod variance;
pub mod workflow;

pub use engine::BudgetEngine;
pub use error::{CoreError, CoreResult};
