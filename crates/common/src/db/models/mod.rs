//! SeaORM entity models

mod report;

pub use report::{
    ActiveModel as ReportActiveModel, Column as ReportColumn, Entity as ReportEntity,
    Model as ReportRow,
};
