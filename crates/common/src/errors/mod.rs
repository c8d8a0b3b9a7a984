//! Error type shared by the library and the gateway
//!
//! Every failure maps to an HTTP status and a machine-readable code. The
//! user-facing message constants in [`messages`] appear verbatim in bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

pub mod messages {
    pub const NO_MATCHING_RECORD: &str = "No matching record found";
    pub const UNAUTHORIZED: &str = "User is not authorized to access this resource";
    pub const UNAUTHENTICATED: &str = "User is not authenticated";
    pub const MISSING_DATA: &str = "Missing required data";
    pub const REPORT_ARCHIVED: &str = "Report is archived and cannot be changed";
    pub const SERVER_ERROR: &str = "An unspecified server error occurred";
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidFormat,
    Unauthenticated,
    InvalidToken,
    ExpiredToken,
    Unauthorized,
    NoMatchingRecord,
    EntityNotFound,
    ReportArchived,
    RateLimited,
    DatabaseError,
    ConnectionError,
    InternalError,
    ConfigurationError,
}

/// Field-level validation failures, keyed by field name
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum AppError {
    /// One or more fields failed their form rules
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: FieldErrors,
    },

    /// Request shape is wrong (unknown state, report type, field, entity type)
    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("{}: {message}", messages::UNAUTHENTICATED)]
    Unauthenticated { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    /// Identity is known but lacks the role or state
    #[error("{}", messages::UNAUTHORIZED)]
    Unauthorized,

    #[error("{}: {report_type}/{state}/{id}", messages::NO_MATCHING_RECORD)]
    NoMatchingRecord {
        report_type: String,
        state: String,
        id: String,
    },

    #[error("{}: {entity_type} with id {id}", messages::NO_MATCHING_RECORD)]
    EntityNotFound { entity_type: String, id: String },

    #[error("{}: {id}", messages::REPORT_ARCHIVED)]
    ReportArchived { id: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("{}: {message}", messages::SERVER_ERROR)]
    Internal { message: String },

    /// Bad built-in template or startup setting
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Unauthenticated { .. } => ErrorCode::Unauthenticated,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::NoMatchingRecord { .. } => ErrorCode::NoMatchingRecord,
            AppError::EntityNotFound { .. } => ErrorCode::EntityNotFound,
            AppError::ReportArchived { .. } => ErrorCode::ReportArchived,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated { .. } | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NoMatchingRecord { .. } | AppError::EntityNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AppError::ReportArchived { .. } => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Storage failures never leak their internals to the caller
        let message = if self.is_server_error() {
            messages::SERVER_ERROR.to_string()
        } else {
            self.to_string()
        };

        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match self {
            AppError::Validation { fields, .. } if !fields.is_empty() => {
                serde_json::to_value(fields).ok()
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let fields = err
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let message = errors
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| messages::MISSING_DATA.to_string());
                (field.to_string(), message)
            })
            .collect();

        AppError::Validation {
            message: err.to_string(),
            fields,
        }
    }
}
