//! Initial schema: units, cycle settings, the Initial and revision proposal
//! tables, unit summaries and proposal history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(UNITS_SQL).await?;
        db.execute_unprepared(CYCLE_SETTINGS_SQL).await?;

        // proposals (Initial) and proposals_rev1..proposals_rev30 share one shape
        db.execute_unprepared(PROPOSAL_TABLE_FN_SQL).await?;
        db.execute_unprepared(PROPOSAL_TABLES_SQL).await?;

        db.execute_unprepared(UNIT_SUMMARIES_SQL).await?;
        db.execute_unprepared(PROPOSAL_HISTORY_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const UNITS_SQL: &str = r"
CREATE TABLE units (
    id VARCHAR(32) PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    ceiling NUMERIC NOT NULL DEFAULT 0,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_units_ceiling CHECK (ceiling >= 0)
);
";

const CYCLE_SETTINGS_SQL: &str = r"
-- Single-row table
CREATE TABLE cycle_settings (
    id SMALLINT PRIMARY KEY DEFAULT 1,
    active_revision SMALLINT NOT NULL DEFAULT 0,
    revision_open BOOLEAN NOT NULL DEFAULT FALSE,
    initial_open BOOLEAN NOT NULL DEFAULT TRUE,
    updated_at TIMESTAMPTZ,
    CONSTRAINT chk_cycle_settings_single_row CHECK (id = 1),
    CONSTRAINT chk_cycle_settings_revision CHECK (active_revision BETWEEN 0 AND 30)
);

INSERT INTO cycle_settings (id) VALUES (1);
";

const PROPOSAL_TABLE_FN_SQL: &str = r"
CREATE OR REPLACE FUNCTION pagu_create_proposal_table(table_name TEXT, with_lineage_index BOOLEAN)
RETURNS VOID AS $$
BEGIN
    EXECUTE format('
        CREATE TABLE %I (
            id UUID PRIMARY KEY,
            unit_id VARCHAR(32) NOT NULL REFERENCES units(id),
            stage VARCHAR(16) NOT NULL,
            category VARCHAR(255) NOT NULL,
            subcategory VARCHAR(255),
            activity TEXT NOT NULL,
            unit_label VARCHAR(64) NOT NULL,
            quantity NUMERIC NOT NULL,
            unit_price NUMERIC NOT NULL,
            total NUMERIC NOT NULL,
            planned_jan NUMERIC NOT NULL DEFAULT 0,
            planned_feb NUMERIC NOT NULL DEFAULT 0,
            planned_mar NUMERIC NOT NULL DEFAULT 0,
            planned_apr NUMERIC NOT NULL DEFAULT 0,
            planned_may NUMERIC NOT NULL DEFAULT 0,
            planned_jun NUMERIC NOT NULL DEFAULT 0,
            planned_jul NUMERIC NOT NULL DEFAULT 0,
            planned_aug NUMERIC NOT NULL DEFAULT 0,
            planned_sep NUMERIC NOT NULL DEFAULT 0,
            planned_oct NUMERIC NOT NULL DEFAULT 0,
            planned_nov NUMERIC NOT NULL DEFAULT 0,
            planned_dec NUMERIC NOT NULL DEFAULT 0,
            executed_jan NUMERIC NOT NULL DEFAULT 0,
            executed_feb NUMERIC NOT NULL DEFAULT 0,
            executed_mar NUMERIC NOT NULL DEFAULT 0,
            executed_apr NUMERIC NOT NULL DEFAULT 0,
            executed_may NUMERIC NOT NULL DEFAULT 0,
            executed_jun NUMERIC NOT NULL DEFAULT 0,
            executed_jul NUMERIC NOT NULL DEFAULT 0,
            executed_aug NUMERIC NOT NULL DEFAULT 0,
            executed_sep NUMERIC NOT NULL DEFAULT 0,
            executed_oct NUMERIC NOT NULL DEFAULT 0,
            executed_nov NUMERIC NOT NULL DEFAULT 0,
            executed_dec NUMERIC NOT NULL DEFAULT 0,
            status VARCHAR(20) NOT NULL DEFAULT ''pending_review'',
            blocked BOOLEAN NOT NULL DEFAULT FALSE,
            lineage_id UUID,
            reviewer_note TEXT,
            created_by UUID,
            submitted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT %I CHECK (quantity > 0 AND unit_price > 0 AND total = quantity * unit_price),
            CONSTRAINT %I CHECK (status IN (''pending_review'', ''accepted'', ''rejected'', ''needs_revision''))
        )',
        table_name,
        'chk_' || table_name || '_total',
        'chk_' || table_name || '_status'
    );

    EXECUTE format('CREATE INDEX %I ON %I (unit_id, status) WHERE NOT blocked',
        'idx_' || table_name || '_unit_status', table_name);

    IF with_lineage_index THEN
        -- At most one successor per predecessor record
        EXECUTE format('CREATE UNIQUE INDEX %I ON %I (lineage_id) WHERE lineage_id IS NOT NULL',
            'uq_' || table_name || '_lineage', table_name);
    END IF;
END;
$$ LANGUAGE plpgsql;
";

const PROPOSAL_TABLES_SQL: &str = r"
DO $$
BEGIN
    PERFORM pagu_create_proposal_table('proposals', FALSE);
    FOR n IN 1..30 LOOP
        PERFORM pagu_create_proposal_table('proposals_rev' || n, TRUE);
    END LOOP;
END;
$$;
";

const UNIT_SUMMARIES_SQL: &str = r"
CREATE TABLE unit_summaries (
    unit_id VARCHAR(32) PRIMARY KEY REFERENCES units(id) ON DELETE CASCADE,
    ceiling NUMERIC NOT NULL,
    total_submitted NUMERIC NOT NULL,
    initial_net_total NUMERIC NOT NULL,
    current_total NUMERIC NOT NULL,
    total_planned NUMERIC NOT NULL,
    total_executed NUMERIC NOT NULL,
    -- keyed by column name: planned_jan .. planned_dec / executed_jan .. executed_dec
    planned_monthly JSONB NOT NULL,
    executed_monthly JSONB NOT NULL,
    status_counts JSONB NOT NULL,
    active_revision VARCHAR(16),
    recomputed_at TIMESTAMPTZ NOT NULL
);
";

const PROPOSAL_HISTORY_SQL: &str = r"
CREATE TABLE proposal_history (
    id UUID PRIMARY KEY,
    record_id UUID NOT NULL,
    stage VARCHAR(16) NOT NULL,
    unit_id VARCHAR(32) NOT NULL,
    action VARCHAR(32) NOT NULL,
    actor UUID,
    detail TEXT,
    at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_proposal_history_record ON proposal_history(record_id, at DESC);
CREATE INDEX idx_proposal_history_unit ON proposal_history(unit_id, at DESC);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS proposal_history CASCADE;
DROP TABLE IF EXISTS unit_summaries CASCADE;
DO $$
BEGIN
    FOR n IN 1..30 LOOP
        EXECUTE format('DROP TABLE IF EXISTS %I CASCADE', 'proposals_rev' || n);
    END LOOP;
END;
$$;
DROP TABLE IF EXISTS proposals CASCADE;
DROP FUNCTION IF EXISTS pagu_create_proposal_table(TEXT, BOOLEAN);
DROP TABLE IF EXISTS cycle_settings CASCADE;
DROP TABLE IF EXISTS units CASCADE;
";
