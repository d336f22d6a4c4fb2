//! `SeaORM` entities for the fixed tables.
//!
//! Proposal tables are one per stage and are addressed by name at runtime;
//! see [`crate::store::row`].

pub mod cycle_settings;
pub mod proposal_history;
pub mod unit_summaries;
pub mod units;
