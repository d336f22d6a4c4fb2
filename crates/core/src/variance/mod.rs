//! Variance comparison ("matrix") between two adjacent stages.

pub mod comparator;
pub mod types;

#[cfg(test)]
mod comparator_props;

pub use comparator::VarianceComparator;
pub use types::{ChangeKind, MatrixReport, MatrixRow, MatrixTotals, UnitMatrix};
