//! `SeaORM` Entity for unit_summaries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "unit_summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub unit_id: String,
    pub ceiling: Decimal,
    pub total_submitted: Decimal,
    pub initial_net_total: Decimal,
    pub current_total: Decimal,
    pub total_planned: Decimal,
    pub total_executed: Decimal,
    #[sea_orm(column_type = "JsonBinary")]
    pub planned_monthly: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub executed_monthly: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub status_counts: Json,
    pub active_revision: Option<String>,
    pub recomputed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::units::Entity",
        from = "Column::UnitId",
        to = "super::units::Column::Id"
    )]
    Units,
}

impl Related<super::units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Units.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
