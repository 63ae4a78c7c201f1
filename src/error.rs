//! Error types for the car rental server

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartError;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::rental::RentalStatus;

/// Stable error codes returned to clients alongside the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    NotAuthorized = 3,
    DbFailure = 4,
    NotFound = 5,
    BadValue = 6,
    Duplicate = 7,
    VehicleNotAvailable = 8,
    InvalidTransition = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Vehicle is already booked from {start_date} to {end_date} (rental {rental_id})")]
    AvailabilityConflict {
        rental_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },

    #[error("Cannot change rental status from {from} to {to}")]
    InvalidTransition {
        from: RentalStatus,
        to: RentalStatus,
        allowed: Vec<RentalStatus>,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Structured context (conflicting range, allowed next states)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// HTTP status this error maps to at the request boundary
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_)
            | AppError::AvailabilityConflict { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message, details) = match &self {
            AppError::Authentication(msg) => (ErrorCode::NotAuthenticated, msg.clone(), None),
            AppError::Authorization(msg) => (ErrorCode::NotAuthorized, msg.clone(), None),
            AppError::NotFound(msg) => (ErrorCode::NotFound, msg.clone(), None),
            AppError::Validation(msg) => (ErrorCode::BadValue, msg.clone(), None),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (ErrorCode::DbFailure, "Database error".to_string(), None)
            }
            AppError::Conflict(msg) => (ErrorCode::Duplicate, msg.clone(), None),
            AppError::AvailabilityConflict {
                rental_id,
                start_date,
                end_date,
            } => (
                ErrorCode::VehicleNotAvailable,
                self.to_string(),
                Some(json!({
                    "rentalId": rental_id,
                    "startDate": start_date,
                    "endDate": end_date,
                })),
            ),
            AppError::InvalidTransition { from, allowed, .. } => (
                ErrorCode::InvalidTransition,
                self.to_string(),
                Some(json!({
                    "currentStatus": from,
                    "allowed": allowed,
                })),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (ErrorCode::Failure, "Internal server error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> Self {
        AppError::Validation(format!("Invalid multipart body: {}", error.body_text()))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
