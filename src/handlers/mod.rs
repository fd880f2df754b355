// Handlers Module
// This module contains the API endpoint handlers and the route table

pub mod health;
pub mod tips;

use axum::{
    http::{Method, Uri},
    routing::{get, post, Router},
};
use std::sync::Arc;

use crate::error::LedgerError;
use crate::services::TipLedger;

/// Shared state handed to every handler
pub struct ApiState {
    pub ledger: TipLedger,
    pub admin_token: Option<String>,
}

// Type alias for the application state
pub type AppState = Arc<ApiState>;

/// Builds the API routes over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/tips", get(tips::get_tips).post(tips::create_tip))
        .route("/tips/expire", post(tips::expire_tips))
        .route("/tips/sender/{sender}", get(tips::get_tips_by_sender))
        .route(
            "/tips/recipient/{nostr_recipient}",
            get(tips::get_tips_by_recipient),
        )
        .route("/tips/{deposit_id}", get(tips::get_tip_by_id))
        .route("/tips/{deposit_id}/claim", post(tips::claim_tip))
        .route("/tips/{deposit_id}/cancel", post(tips::cancel_tip))
        .route(
            "/tips/{deposit_id}/recipient",
            post(tips::resolve_tip_recipient),
        )
        .fallback(unknown_route)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

async fn unknown_route(uri: Uri) -> LedgerError {
    LedgerError::RouteNotFound(uri.path().to_string())
}

async fn method_not_allowed(method: Method, uri: Uri) -> LedgerError {
    LedgerError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
