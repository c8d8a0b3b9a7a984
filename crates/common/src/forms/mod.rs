//! Form schema registry and validation
//!
//! Provides:
//! - Field rules (required, numeric, date, conditional "when" requirements)
//! - Compiled form schemas with page-level and field-level validation
//! - Report templates: the page tree each report type is rendered from
//! - A registry of every built-in template and form

pub mod registry;
pub mod rules;
pub mod schema;
pub mod template;

pub use registry::{FormRegistry, ADD_EDIT_PROGRAM};
pub use rules::{is_number, parse_date, Requirement, Rule, OTHER_SPECIFY};
pub use schema::{FieldSchema, FormSchema, ValidationErrors};
pub use template::{flatten_routes, FormJson, PageType, ReportRoute, ReportTemplate};
