//! Postgres-backed report store
//!
//! Per-document writes run inside a transaction holding a row lock
//! (`SELECT ... FOR UPDATE`), so concurrent edits to one report apply one
//! after the other.

use crate::db::models::*;
use crate::db::{DbPool, ReportMutation, ReportStore};
use crate::errors::{AppError, Result};
use crate::reports::{Report, ReportKey, ReportMetadata, ReportType};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;
use tracing::debug;

/// Repository for report data access
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }
}

fn row_to_report(row: ReportRow) -> Result<Report> {
    let field_data = match row.field_data {
        Value::Object(map) => map,
        Value::Null => Default::default(),
        other => {
            return Err(AppError::Internal {
                message: format!("report {} has non-object field data: {}", row.id, other),
            })
        }
    };

    Ok(Report {
        report_type: row.report_type.parse()?,
        state: row.state,
        id: row.id,
        program_name: row.program_name,
        status: row.status.parse()?,
        due_date: row.due_date,
        reporting_period_start_date: row.reporting_period_start_date,
        reporting_period_end_date: row.reporting_period_end_date,
        combined_data: row.combined_data,
        submitted_by: row.submitted_by,
        submitted_on: row.submitted_on.map(|t| t.with_timezone(&Utc)),
        created_at: row.created_at.with_timezone(&Utc),
        last_altered: row.last_altered.with_timezone(&Utc),
        last_altered_by: row.last_altered_by,
        archived: row.archived,
        form_template_id: row.form_template_id,
        field_data,
    })
}

fn report_to_active(report: &Report) -> ReportActiveModel {
    ReportActiveModel {
        id: Set(report.id.clone()),
        report_type: Set(report.report_type.as_str().to_string()),
        state: Set(report.state.clone()),
        program_name: Set(report.program_name.clone()),
        status: Set(report.status.as_str().to_string()),
        due_date: Set(report.due_date.clone()),
        reporting_period_start_date: Set(report.reporting_period_start_date.clone()),
        reporting_period_end_date: Set(report.reporting_period_end_date.clone()),
        combined_data: Set(report.combined_data),
        submitted_by: Set(report.submitted_by.clone()),
        submitted_on: Set(report.submitted_on.map(Into::into)),
        created_at: Set(report.created_at.into()),
        last_altered: Set(report.last_altered.into()),
        last_altered_by: Set(report.last_altered_by.clone()),
        archived: Set(report.archived),
        form_template_id: Set(report.form_template_id.clone()),
        field_data: Set(Value::Object(report.field_data.clone())),
    }
}

#[async_trait]
impl ReportStore for Repository {
    async fn get(&self, key: &ReportKey) -> Result<Option<Report>> {
        ReportEntity::find_by_id(key.id.clone())
            .filter(ReportColumn::ReportType.eq(key.report_type.as_str()))
            .filter(ReportColumn::State.eq(key.state.as_str()))
            .one(self.conn())
            .await?
            .map(row_to_report)
            .transpose()
    }

    async fn list_by_state(
        &self,
        report_type: ReportType,
        state: &str,
    ) -> Result<Vec<ReportMetadata>> {
        let rows = ReportEntity::find()
            .filter(ReportColumn::ReportType.eq(report_type.as_str()))
            .filter(ReportColumn::State.eq(state))
            .order_by_asc(ReportColumn::CreatedAt)
            .all(self.conn())
            .await?;

        rows.into_iter()
            .map(|row| row_to_report(row).map(|report| report.metadata()))
            .collect()
    }

    async fn insert(&self, report: &Report) -> Result<()> {
        report_to_active(report).insert(self.conn()).await?;
        debug!(report_id = %report.id, "Report row inserted");
        Ok(())
    }

    async fn update(&self, key: &ReportKey, mutate: ReportMutation) -> Result<Option<Report>> {
        let txn = self.conn().begin().await?;

        let row = ReportEntity::find_by_id(key.id.clone())
            .filter(ReportColumn::ReportType.eq(key.report_type.as_str()))
            .filter(ReportColumn::State.eq(key.state.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let Some(row) = row else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut report = row_to_report(row)?;
        // dropping the transaction on error rolls it back
        mutate(&mut report)?;

        report_to_active(&report).update(&txn).await?;
        txn.commit().await?;

        debug!(report_id = %report.id, "Report row updated");
        Ok(Some(report))
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
