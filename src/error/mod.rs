use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::DbError;
use crate::models::DepositState;
use crate::services::address::AddressError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid {field} address")]
    InvalidAddress {
        field: &'static str,
        #[source]
        reason: AddressError,
    },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Tip deposit {0} not found")]
    NotFound(String),
    #[error("Tip deposit {deposit_id} is {state}")]
    InvalidState {
        deposit_id: String,
        state: DepositState,
    },
    #[error("Not authorized to {0}")]
    Unauthorized(String),
    #[error("Tip deposit {0} already has a resolved recipient")]
    RecipientAlreadyResolved(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("No route for {0}")]
    RouteNotFound(String),
    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn invalid_address(field: &'static str, reason: AddressError) -> Self {
        LedgerError::InvalidAddress { field, reason }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::InvalidAddress { .. }
            | LedgerError::InvalidAmount(_)
            | LedgerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            LedgerError::Unauthorized(_) => StatusCode::FORBIDDEN,
            LedgerError::NotFound(_) | LedgerError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            LedgerError::InvalidState { .. } | LedgerError::RecipientAlreadyResolved(_) => {
                StatusCode::CONFLICT
            }
            LedgerError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Detail stays in the operator log, never in the response body
            LedgerError::InternalError(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "code": status.as_u16(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

// DbError to LedgerError conversion implementation
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        LedgerError::InternalError(err.to_string())
    }
}
