//! Report entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub report_type: String,

    pub state: String,

    #[sea_orm(column_type = "Text")]
    pub program_name: String,

    pub status: String,

    pub due_date: String,

    pub reporting_period_start_date: String,

    pub reporting_period_end_date: String,

    pub combined_data: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub submitted_by: Option<String>,

    pub submitted_on: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub last_altered: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub last_altered_by: String,

    pub archived: bool,

    pub form_template_id: String,

    /// Answers and entity arrays as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub field_data: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
