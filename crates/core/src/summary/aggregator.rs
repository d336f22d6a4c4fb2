//! Pure summary computations.

use chrono::{DateTime, Utc};
use pagu_shared::types::UnitId;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::context::Unit;
use crate::proposal::ProposalRecord;
use crate::stage::Stage;
use crate::summary::types::{PortfolioSummary, StageAggregate, UnitSummary};

/// Stateless summary computations.
pub struct SummaryAggregator;

impl SummaryAggregator {
    /// Builds a unit summary from per-stage aggregates.
    #[must_use]
    pub fn combine(
        unit: &Unit,
        initial: StageAggregate,
        revision: Option<(Stage, StageAggregate)>,
        now: DateTime<Utc>,
    ) -> UnitSummary {
        let (active_revision, total) = match revision {
            Some((stage, aggregate)) => (Some(stage), initial.merge(aggregate)),
            None => (None, initial),
        };

        UnitSummary {
            unit_id: unit.id.clone(),
            ceiling: unit.ceiling,
            total_submitted: total.submitted,
            initial_net_total: initial.committed,
            current_total: total.committed,
            total_planned: total.planned.total(),
            total_executed: total.executed.total(),
            planned_monthly: total.planned,
            executed_monthly: total.executed,
            status_counts: total.counts,
            active_revision,
            recomputed_at: now,
        }
    }

    /// Builds a unit summary by scanning its records.
    ///
    /// Records of other units are ignored.
    #[must_use]
    pub fn compute(
        unit: &Unit,
        initial: &[ProposalRecord],
        revision: Option<(Stage, &[ProposalRecord])>,
        now: DateTime<Utc>,
    ) -> UnitSummary {
        let own = |records: &[ProposalRecord]| {
            StageAggregate::fold(records.iter().filter(|r| r.unit_id == unit.id))
        };
        Self::combine(
            unit,
            own(initial),
            revision.map(|(stage, records)| (stage, own(records))),
            now,
        )
    }

    /// Builds summaries for many units at once.
    ///
    /// Records are grouped by unit once, then every unit is folded in parallel.
    #[must_use]
    pub fn compute_many(
        units: &[Unit],
        initial: &[ProposalRecord],
        revision: Option<(Stage, &[ProposalRecord])>,
        now: DateTime<Utc>,
    ) -> Vec<UnitSummary> {
        let initial_by_unit = group_by_unit(initial);
        let revision_by_unit = revision.map(|(stage, records)| (stage, group_by_unit(records)));

        units
            .par_iter()
            .map(|unit| {
                let initial = aggregate_group(&initial_by_unit, &unit.id);
                let revision = revision_by_unit
                    .as_ref()
                    .map(|(stage, groups)| (*stage, aggregate_group(groups, &unit.id)));
                Self::combine(unit, initial, revision, now)
            })
            .collect()
    }

    /// Totals over all summary rows.
    #[must_use]
    pub fn portfolio(summaries: &[UnitSummary]) -> PortfolioSummary {
        summaries
            .iter()
            .fold(PortfolioSummary::default(), |mut acc, s| {
                acc.units += 1;
                acc.total_ceiling += s.ceiling;
                acc.total_submitted += s.total_submitted;
                acc.initial_net_total += s.initial_net_total;
                acc.current_total += s.current_total;
                acc.total_planned += s.total_planned;
                acc.total_executed += s.total_executed;
                acc.planned_monthly += s.planned_monthly;
                acc.executed_monthly += s.executed_monthly;
                acc.status_counts = acc.status_counts.merge(s.status_counts);
                acc
            })
    }
}

fn group_by_unit(records: &[ProposalRecord]) -> HashMap<&UnitId, Vec<&ProposalRecord>> {
    let mut groups: HashMap<&UnitId, Vec<&ProposalRecord>> = HashMap::new();
    for record in records {
        groups.entry(&record.unit_id).or_default().push(record);
    }
    groups
}

fn aggregate_group(
    groups: &HashMap<&UnitId, Vec<&ProposalRecord>>,
    unit: &UnitId,
) -> StageAggregate {
    groups
        .get(unit)
        .map(|records| StageAggregate::fold(records.iter().copied()))
        .unwrap_or_default()
}
