//! Mapping between proposal table rows and [`ProposalRecord`].

use chrono::{DateTime, Utc};
use pagu_core::proposal::{Classification, Month, MonthlyAmounts, ProposalRecord};
use pagu_core::stage::Stage;
use pagu_core::workflow::ReviewStatus;
use pagu_shared::types::{ProposalId, UnitId, UserId};
use rust_decimal::Decimal;
use sea_orm::{DbErr, FromQueryResult, QueryResult, Value};
use serde_json::{Map, Value as Json};
use std::str::FromStr;
use uuid::Uuid;

const LEADING_COLUMNS: [&str; 10] = [
    "id",
    "unit_id",
    "stage",
    "category",
    "subcategory",
    "activity",
    "unit_label",
    "quantity",
    "unit_price",
    "total",
];

const TRAILING_COLUMNS: [&str; 7] = [
    "status",
    "blocked",
    "lineage_id",
    "reviewer_note",
    "created_by",
    "submitted_at",
    "updated_at",
];

/// Every proposal column, in the order [`row_values`] produces values.
#[must_use]
pub fn proposal_columns() -> Vec<String> {
    LEADING_COLUMNS
        .iter()
        .map(ToString::to_string)
        .chain(Month::ALL.iter().map(Month::planned_column))
        .chain(Month::ALL.iter().map(Month::executed_column))
        .chain(TRAILING_COLUMNS.iter().map(ToString::to_string))
        .collect()
}

/// Column values of `record`, aligned with [`proposal_columns`].
#[must_use]
pub fn row_values(record: &ProposalRecord) -> Vec<Value> {
    let mut values: Vec<Value> = vec![
        record.id.into_inner().into(),
        record.unit_id.as_str().into(),
        record.stage.label().into(),
        record.classification.category.clone().into(),
        record.classification.subcategory.clone().into(),
        record.classification.activity.clone().into(),
        record.unit_label.clone().into(),
        record.quantity.into(),
        record.unit_price.into(),
        record.total.into(),
    ];
    values.extend(record.planned.as_array().iter().map(|a| Value::from(*a)));
    values.extend(record.executed.as_array().iter().map(|a| Value::from(*a)));
    values.extend([
        record.status.as_str().into(),
        record.blocked.into(),
        record.lineage_id.map(ProposalId::into_inner).into(),
        record.reviewer_note.clone().into(),
        record.created_by.map(UserId::into_inner).into(),
        record.submitted_at.into(),
        record.updated_at.into(),
    ]);
    values
}

/// A proposal row read from any stage table.
#[derive(Debug, Clone)]
pub struct ProposalRow(pub ProposalRecord);

fn monthly(
    res: &QueryResult,
    pre: &str,
    column: fn(&Month) -> String,
) -> Result<MonthlyAmounts, DbErr> {
    let mut amounts = MonthlyAmounts::ZERO;
    for month in Month::ALL {
        amounts[month] = res.try_get::<Decimal>(pre, &column(&month))?;
    }
    Ok(amounts)
}

impl FromQueryResult for ProposalRow {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        let stage_label: String = res.try_get(pre, "stage")?;
        let stage = Stage::parse(&stage_label).map_err(|e| DbErr::Type(e.to_string()))?;
        let status_raw: String = res.try_get(pre, "status")?;
        let status = ReviewStatus::parse(&status_raw)
            .ok_or_else(|| DbErr::Type(format!("unknown review status: {status_raw}")))?;
        let unit_raw: String = res.try_get(pre, "unit_id")?;
        let unit_id = UnitId::parse(&unit_raw).map_err(|e| DbErr::Type(e.to_string()))?;

        Ok(Self(ProposalRecord {
            id: ProposalId::from_uuid(res.try_get::<Uuid>(pre, "id")?),
            unit_id,
            stage,
            classification: Classification {
                category: res.try_get(pre, "category")?,
                subcategory: res.try_get(pre, "subcategory")?,
                activity: res.try_get(pre, "activity")?,
            },
            unit_label: res.try_get(pre, "unit_label")?,
            quantity: res.try_get(pre, "quantity")?,
            unit_price: res.try_get(pre, "unit_price")?,
            total: res.try_get(pre, "total")?,
            planned: monthly(res, pre, Month::planned_column)?,
            executed: monthly(res, pre, Month::executed_column)?,
            status,
            blocked: res.try_get(pre, "blocked")?,
            lineage_id: res
                .try_get::<Option<Uuid>>(pre, "lineage_id")?
                .map(ProposalId::from_uuid),
            reviewer_note: res.try_get(pre, "reviewer_note")?,
            created_by: res
                .try_get::<Option<Uuid>>(pre, "created_by")?
                .map(UserId::from_uuid),
            submitted_at: res.try_get::<DateTime<Utc>>(pre, "submitted_at")?,
            updated_at: res.try_get::<DateTime<Utc>>(pre, "updated_at")?,
        }))
    }
}

/// Monthly amounts as a JSON object keyed by column name (`planned_jan`, ...).
#[must_use]
pub fn monthly_to_json(amounts: &MonthlyAmounts, column: fn(&Month) -> String) -> Json {
    let map: Map<String, Json> = amounts
        .iter()
        .map(|(month, amount)| (column(&month), Json::String(amount.to_string())))
        .collect();
    Json::Object(map)
}

/// Reads an object written by [`monthly_to_json`]; missing months are zero.
///
/// # Errors
///
/// Returns `DbErr::Type` if the value is not an object of decimal amounts.
pub fn monthly_from_json(
    value: &Json,
    column: fn(&Month) -> String,
) -> Result<MonthlyAmounts, DbErr> {
    let object = value
        .as_object()
        .ok_or_else(|| DbErr::Type("monthly amounts must be a JSON object".to_string()))?;
    let mut amounts = MonthlyAmounts::ZERO;
    for month in Month::ALL {
        let Some(raw) = object.get(&column(&month)) else {
            continue;
        };
        let text = match raw {
            Json::String(s) => s.clone(),
            Json::Number(n) => n.to_string(),
            other => return Err(DbErr::Type(format!("invalid monthly amount: {other}"))),
        };
        amounts[month] = Decimal::from_str(&text).map_err(|e| DbErr::Type(e.to_string()))?;
    }
    Ok(amounts)
}
