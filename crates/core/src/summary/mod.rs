//! Summary aggregation.
//!
//! A unit summary is always rebuilt from the unit's records, never patched
//! incrementally. Overlapping rebuilds for one unit may race; the last upsert
//! wins, which is fine for a derived cache.

pub mod aggregator;
pub mod service;
pub mod types;

#[cfg(test)]
mod aggregator_props;

pub use aggregator::SummaryAggregator;
pub use service::SummaryService;
pub use types::{PeriodBreakdown, PortfolioSummary, StageAggregate, StatusCounts, UnitSummary};
