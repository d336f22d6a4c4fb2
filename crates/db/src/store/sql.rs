//! Raw statements for the server-side capabilities.
//!
//! Table names come from the stage lookup table, never from callers, and are
//! quoted as identifiers.

use pagu_core::proposal::Month;
use pagu_core::workflow::ReviewStatus;

use super::row::proposal_columns;

fn quote(table: &str) -> String {
    format!("\"{}\"", table.replace('"', "\"\""))
}

/// Copies committed records of `source` that have no successor in
/// `destination` yet.
///
/// Parameters: `$1` destination stage label, `$2` migrating user,
/// `$3` timestamp, `$4` optional unit filter.
#[must_use]
pub fn bulk_copy(source: &str, destination: &str) -> String {
    let columns = proposal_columns();
    let projections: Vec<String> = columns
        .iter()
        .map(|column| match column.as_str() {
            "id" => "gen_random_uuid()".to_string(),
            "stage" => "$1".to_string(),
            "status" => format!("'{}'", ReviewStatus::PendingReview.as_str()),
            "blocked" => "FALSE".to_string(),
            "lineage_id" => "s.id".to_string(),
            "reviewer_note" => "NULL".to_string(),
            "created_by" => "$2".to_string(),
            "submitted_at" | "updated_at" => "$3".to_string(),
            c if c.starts_with("executed_") => "0".to_string(),
            c => format!("s.{c}"),
        })
        .collect();

    format!(
        "INSERT INTO {dest} ({columns}) \
         SELECT {projections} FROM {src} s \
         WHERE s.status = '{accepted}' AND NOT s.blocked \
         AND ($4::varchar IS NULL OR s.unit_id = $4) \
         AND NOT EXISTS (SELECT 1 FROM {dest} d WHERE d.lineage_id = s.id) \
         RETURNING *",
        dest = quote(destination),
        src = quote(source),
        columns = columns.join(", "),
        projections = projections.join(", "),
        accepted = ReviewStatus::Accepted.as_str(),
    )
}

/// Aggregates one unit of `table`. Parameter: `$1` unit id.
///
/// Yields `submitted`, `committed`, every monthly column and one count per
/// review status plus `blocked`.
#[must_use]
pub fn aggregate_unit(table: &str) -> String {
    let committed = format!(
        "status = '{}' AND NOT blocked",
        ReviewStatus::Accepted.as_str()
    );
    let mut parts = vec![
        "COALESCE(SUM(total), 0) AS submitted".to_string(),
        format!("COALESCE(SUM(total) FILTER (WHERE {committed}), 0) AS committed"),
    ];
    parts.extend(
        Month::ALL
            .iter()
            .flat_map(|m| [m.planned_column(), m.executed_column()])
            .map(|c| format!("COALESCE(SUM({c}) FILTER (WHERE {committed}), 0) AS {c}")),
    );
    parts.extend(ReviewStatus::ALL.iter().map(|status| {
        let s = status.as_str();
        format!("COUNT(*) FILTER (WHERE status = '{s}') AS {s}")
    }));
    parts.push("COUNT(*) FILTER (WHERE blocked) AS blocked".to_string());

    format!(
        "SELECT {} FROM {} WHERE unit_id = $1",
        parts.join(", "),
        quote(table)
    )
}
