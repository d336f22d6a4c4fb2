//! Postgres implementation of [`ProposalStore`].
//!
//! Units, summaries, history and settings go through `SeaORM` entities.
//! Proposal tables are one per stage, so their statements are built with
//! `sea_query` against the table name of the stage location.

pub mod row;
pub mod sql;

use async_trait::async_trait;
use chrono::Utc;
use pagu_core::context::{CycleSettings, Unit};
use pagu_core::proposal::{Month, ProposalRecord};
use pagu_core::stage::{Stage, StageLocation};
use pagu_core::store::{
    BulkCopyRequest, HistoryQuery, ProposalStore, RecordFilter, StoreCapabilities, StoreError,
    StoreResult,
};
use pagu_core::summary::{StageAggregate, StatusCounts, UnitSummary};
use pagu_core::workflow::{HistoryAction, HistoryEntry, ReviewStatus};
use pagu_shared::types::{HistoryId, PageRequest, ProposalId, UnitId, UserId};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Asterisk, Expr, OnConflict, Order, Query, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QueryResult,
    QuerySelect, SqlErr, Statement, TransactionTrait,
};
use tracing::{debug, instrument};

use crate::entities::{cycle_settings, proposal_history, unit_summaries, units};
use row::{ProposalRow, monthly_from_json, monthly_to_json, proposal_columns, row_values};

/// Proposal store backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgProposalStore {
    db: DatabaseConnection,
}

impl PgProposalStore {
    /// Creates a store over an open connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn map_db_err(e: DbErr) -> StoreError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
        _ => StoreError::Database(e.to_string()),
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("invalid {what} in store: {detail}"))
}

fn table(location: &StageLocation) -> Alias {
    Alias::new(location.as_str())
}

fn col(name: &str) -> Alias {
    Alias::new(name)
}

fn unit_from_model(model: units::Model) -> StoreResult<Unit> {
    Ok(Unit {
        id: UnitId::parse(&model.id).map_err(|e| corrupt("unit id", e))?,
        name: model.name,
        ceiling: model.ceiling,
        active: model.active,
    })
}

fn summary_from_model(model: unit_summaries::Model) -> StoreResult<UnitSummary> {
    let status_counts: StatusCounts =
        serde_json::from_value(model.status_counts).map_err(|e| corrupt("status counts", e))?;
    let active_revision = model
        .active_revision
        .as_deref()
        .map(Stage::parse)
        .transpose()
        .map_err(|e| corrupt("stage", e))?;

    Ok(UnitSummary {
        unit_id: UnitId::parse(&model.unit_id).map_err(|e| corrupt("unit id", e))?,
        ceiling: model.ceiling,
        total_submitted: model.total_submitted,
        initial_net_total: model.initial_net_total,
        current_total: model.current_total,
        total_planned: model.total_planned,
        total_executed: model.total_executed,
        planned_monthly: monthly_from_json(&model.planned_monthly, Month::planned_column)
            .map_err(map_db_err)?,
        executed_monthly: monthly_from_json(&model.executed_monthly, Month::executed_column)
            .map_err(map_db_err)?,
        status_counts,
        active_revision,
        recomputed_at: model.recomputed_at.to_utc(),
    })
}

fn history_from_model(model: proposal_history::Model) -> StoreResult<HistoryEntry> {
    Ok(HistoryEntry {
        id: HistoryId::from_uuid(model.id),
        record_id: ProposalId::from_uuid(model.record_id),
        stage: Stage::parse(&model.stage).map_err(|e| corrupt("stage", e))?,
        unit_id: UnitId::parse(&model.unit_id).map_err(|e| corrupt("unit id", e))?,
        action: HistoryAction::parse(&model.action)
            .ok_or_else(|| corrupt("history action", &model.action))?,
        actor: model.actor.map(UserId::from_uuid),
        detail: model.detail,
        at: model.at.to_utc(),
    })
}

fn aggregate_from_row(row: &QueryResult) -> Result<StageAggregate, DbErr> {
    let count = |name: &str| -> Result<u64, DbErr> {
        let n: i64 = row.try_get("", name)?;
        u64::try_from(n).map_err(|e| DbErr::Type(e.to_string()))
    };
    let mut aggregate = StageAggregate {
        committed: row.try_get("", "committed")?,
        submitted: row.try_get("", "submitted")?,
        ..StageAggregate::default()
    };
    for month in Month::ALL {
        aggregate.planned[month] = row.try_get::<Decimal>("", &month.planned_column())?;
        aggregate.executed[month] = row.try_get::<Decimal>("", &month.executed_column())?;
    }
    aggregate.counts = StatusCounts {
        pending_review: count(ReviewStatus::PendingReview.as_str())?,
        accepted: count(ReviewStatus::Accepted.as_str())?,
        rejected: count(ReviewStatus::Rejected.as_str())?,
        needs_revision: count(ReviewStatus::NeedsRevision.as_str())?,
        blocked: count("blocked")?,
    };
    Ok(aggregate)
}

#[async_trait]
impl ProposalStore for PgProposalStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            bulk_copy: true,
            aggregate: true,
        }
    }

    #[instrument(skip(self, filter), fields(table = %location))]
    async fn list_records(
        &self,
        location: &StageLocation,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<ProposalRecord>> {
        let mut select = Query::select();
        select.column(Asterisk).from(table(location));

        if let Some(unit) = &filter.unit_id {
            select.and_where(Expr::col(col("unit_id")).eq(unit.as_str()));
        }
        if let Some(status) = filter.status {
            select.and_where(Expr::col(col("status")).eq(status.as_str()));
        }
        if let Some(blocked) = filter.blocked {
            select.and_where(Expr::col(col("blocked")).eq(blocked));
        }
        if let Some(lineage) = filter.lineage_id {
            select.and_where(Expr::col(col("lineage_id")).eq(lineage.into_inner()));
        }
        if let Some(category) = &filter.category {
            select.and_where(Expr::col(col("category")).eq(category.as_str()));
        }
        if let Some(subcategory) = &filter.subcategory {
            select.and_where(Expr::col(col("subcategory")).eq(subcategory.as_str()));
        }
        select
            .order_by(col("unit_id"), Order::Asc)
            .order_by(col("submitted_at"), Order::Asc);

        let statement = self.db.get_database_backend().build(&select);
        let rows = ProposalRow::find_by_statement(statement)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        debug!(count = rows.len(), "listed records");
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn get_record(
        &self,
        location: &StageLocation,
        id: ProposalId,
    ) -> StoreResult<Option<ProposalRecord>> {
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(table(location))
            .and_where(Expr::col(col("id")).eq(id.into_inner()));

        let statement = self.db.get_database_backend().build(&select);
        let row = ProposalRow::find_by_statement(statement)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(row.map(|r| r.0))
    }

    #[instrument(skip(self, records), fields(table = %location, count = records.len()))]
    async fn insert_records(
        &self,
        location: &StageLocation,
        records: &[ProposalRecord],
    ) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let columns = proposal_columns();
        let mut insert = Query::insert();
        insert
            .into_table(table(location))
            .columns(columns.iter().map(|c| col(c)));
        for record in records {
            insert
                .values(row_values(record).into_iter().map(SimpleExpr::Value))
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        // One multi-row statement: all records land or none do
        let statement = self.db.get_database_backend().build(&insert);
        self.db.execute(statement).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn update_record(
        &self,
        location: &StageLocation,
        record: &ProposalRecord,
    ) -> StoreResult<()> {
        let assignments = proposal_columns()
            .into_iter()
            .zip(row_values(record))
            .skip(1)
            .map(|(c, v)| (col(&c), SimpleExpr::Value(v)));

        let mut update = Query::update();
        update
            .table(table(location))
            .values(assignments)
            .and_where(Expr::col(col("id")).eq(record.id.into_inner()));

        let statement = self.db.get_database_backend().build(&update);
        let result = self.db.execute(statement).await.map_err(map_db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "record {} in {location}",
                record.id
            )));
        }
        Ok(())
    }

    async fn delete_record(&self, location: &StageLocation, id: ProposalId) -> StoreResult<bool> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let mut delete = Query::delete();
        delete
            .from_table(table(location))
            .and_where(Expr::col(col("id")).eq(id.into_inner()));
        let statement = txn.get_database_backend().build(&delete);
        let deleted = txn.execute(statement).await.map_err(map_db_err)?.rows_affected();

        proposal_history::Entity::delete_many()
            .filter(proposal_history::Column::RecordId.eq(id.into_inner()))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(deleted > 0)
    }

    async fn get_unit(&self, id: &UnitId) -> StoreResult<Option<Unit>> {
        units::Entity::find_by_id(id.as_str())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(unit_from_model)
            .transpose()
    }

    async fn list_units(&self) -> StoreResult<Vec<Unit>> {
        units::Entity::find()
            .order_by_asc(units::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(unit_from_model)
            .collect()
    }

    async fn upsert_unit(&self, unit: &Unit) -> StoreResult<()> {
        let model = units::ActiveModel {
            id: Set(unit.id.as_str().to_string()),
            name: Set(unit.name.clone()),
            ceiling: Set(unit.ceiling),
            active: Set(unit.active),
            created_at: Set(Utc::now().fixed_offset()),
        };
        units::Entity::insert(model)
            .on_conflict(
                OnConflict::column(units::Column::Id)
                    .update_columns([
                        units::Column::Name,
                        units::Column::Ceiling,
                        units::Column::Active,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn set_ceiling(&self, id: &UnitId, ceiling: Decimal) -> StoreResult<Option<Unit>> {
        let result = units::Entity::update_many()
            .col_expr(units::Column::Ceiling, Expr::value(ceiling))
            .filter(units::Column::Id.eq(id.as_str()))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get_unit(id).await
    }

    async fn upsert_summary(&self, summary: &UnitSummary) -> StoreResult<()> {
        use unit_summaries::Column;

        let status_counts = serde_json::to_value(summary.status_counts)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let model = unit_summaries::ActiveModel {
            unit_id: Set(summary.unit_id.as_str().to_string()),
            ceiling: Set(summary.ceiling),
            total_submitted: Set(summary.total_submitted),
            initial_net_total: Set(summary.initial_net_total),
            current_total: Set(summary.current_total),
            total_planned: Set(summary.total_planned),
            total_executed: Set(summary.total_executed),
            planned_monthly: Set(monthly_to_json(&summary.planned_monthly, Month::planned_column)),
            executed_monthly: Set(monthly_to_json(
                &summary.executed_monthly,
                Month::executed_column,
            )),
            status_counts: Set(status_counts),
            active_revision: Set(summary.active_revision.map(|s| s.label())),
            recomputed_at: Set(summary.recomputed_at.fixed_offset()),
        };

        unit_summaries::Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::UnitId)
                    .update_columns([
                        Column::Ceiling,
                        Column::TotalSubmitted,
                        Column::InitialNetTotal,
                        Column::CurrentTotal,
                        Column::TotalPlanned,
                        Column::TotalExecuted,
                        Column::PlannedMonthly,
                        Column::ExecutedMonthly,
                        Column::StatusCounts,
                        Column::ActiveRevision,
                        Column::RecomputedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_summary(&self, unit: &UnitId) -> StoreResult<Option<UnitSummary>> {
        unit_summaries::Entity::find_by_id(unit.as_str())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(summary_from_model)
            .transpose()
    }

    async fn list_summaries(&self) -> StoreResult<Vec<UnitSummary>> {
        unit_summaries::Entity::find()
            .order_by_asc(unit_summaries::Column::UnitId)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(summary_from_model)
            .collect()
    }

    async fn append_history(&self, entries: &[HistoryEntry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let models = entries.iter().map(|entry| proposal_history::ActiveModel {
            id: Set(entry.id.into_inner()),
            record_id: Set(entry.record_id.into_inner()),
            stage: Set(entry.stage.label()),
            unit_id: Set(entry.unit_id.as_str().to_string()),
            action: Set(entry.action.as_str().to_string()),
            actor: Set(entry.actor.map(UserId::into_inner)),
            detail: Set(entry.detail.clone()),
            at: Set(entry.at.fixed_offset()),
        });
        proposal_history::Entity::insert_many(models)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn list_history(
        &self,
        query: &HistoryQuery,
        page: &PageRequest,
    ) -> StoreResult<(Vec<HistoryEntry>, u64)> {
        let page = page.normalized();
        let mut select = proposal_history::Entity::find();
        if let Some(record_id) = query.record_id {
            select = select.filter(proposal_history::Column::RecordId.eq(record_id.into_inner()));
        }
        if let Some(unit) = &query.unit_id {
            select = select.filter(proposal_history::Column::UnitId.eq(unit.as_str()));
        }
        if let Some(stage) = query.stage {
            select = select.filter(proposal_history::Column::Stage.eq(stage.label()));
        }

        let total = select.clone().count(&self.db).await.map_err(map_db_err)?;
        let entries = select
            .order_by_desc(proposal_history::Column::At)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(history_from_model)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((entries, total))
    }

    async fn load_settings(&self) -> StoreResult<CycleSettings> {
        let Some(model) = cycle_settings::Entity::find_by_id(cycle_settings::SETTINGS_ROW)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(CycleSettings::default());
        };
        Ok(CycleSettings {
            active_revision: u8::try_from(model.active_revision)
                .map_err(|e| corrupt("active revision", e))?,
            revision_open: model.revision_open,
            initial_open: model.initial_open,
            updated_at: model.updated_at.map(|t| t.to_utc()),
        })
    }

    async fn save_settings(&self, settings: &CycleSettings) -> StoreResult<()> {
        let model = cycle_settings::ActiveModel {
            id: Set(cycle_settings::SETTINGS_ROW),
            active_revision: Set(i16::from(settings.active_revision)),
            revision_open: Set(settings.revision_open),
            initial_open: Set(settings.initial_open),
            updated_at: Set(settings.updated_at.map(|t| t.fixed_offset())),
        };
        cycle_settings::Entity::insert(model)
            .on_conflict(
                OnConflict::column(cycle_settings::Column::Id)
                    .update_columns([
                        cycle_settings::Column::ActiveRevision,
                        cycle_settings::Column::RevisionOpen,
                        cycle_settings::Column::InitialOpen,
                        cycle_settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(source = %request.source, destination = %request.destination))]
    async fn bulk_copy(&self, request: &BulkCopyRequest) -> StoreResult<Vec<ProposalRecord>> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql::bulk_copy(
                request.source_location.as_str(),
                request.destination_location.as_str(),
            ),
            [
                request.destination.label().into(),
                request.migrated_by.map(UserId::into_inner).into(),
                request.at.into(),
                request
                    .unit_id
                    .as_ref()
                    .map(|u| u.as_str().to_string())
                    .into(),
            ],
        );
        let rows = ProposalRow::find_by_statement(statement)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        debug!(inserted = rows.len(), "bulk copy finished");
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn aggregate_unit(
        &self,
        location: &StageLocation,
        unit: &UnitId,
    ) -> StoreResult<StageAggregate> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql::aggregate_unit(location.as_str()),
            [unit.as_str().into()],
        );
        let row = self
            .db
            .query_one(statement)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::Database("aggregate returned no row".to_string()))?;
        aggregate_from_row(&row).map_err(map_db_err)
    }
}
