// Handlers for tip deposit endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    Json,
};

use crate::error::{LedgerError, LedgerResult};
use crate::handlers::AppState;
use crate::models::{
    Actor, CancelTipRequest, ClaimTipRequest, CreateTipRequest, DataResponse,
    ExpiredTipsResponse, NewTipDeposit, PaginationParams, ResolveRecipientRequest, TipDeposit,
    TipDepositData,
};

type TipsResponse = Json<DataResponse<Vec<TipDepositData>>>;
type TipResponse = Json<DataResponse<TipDepositData>>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> LedgerResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| LedgerError::InvalidRequest(e.body_text()))
}

fn pagination(params: Result<Query<PaginationParams>, QueryRejection>) -> LedgerResult<PaginationParams> {
    params
        .map(|Query(p)| p)
        .map_err(|e| LedgerError::InvalidRequest(e.body_text()))
}

fn many(deposits: Vec<TipDeposit>) -> TipsResponse {
    Json(DataResponse::new(
        deposits.into_iter().map(TipDepositData::from).collect(),
    ))
}

fn one(deposit: TipDeposit) -> TipResponse {
    Json(DataResponse::new(deposit.into()))
}

/// Compares every byte regardless of where the first mismatch is
fn tokens_match(expected: &str, given: &str) -> bool {
    let (expected, given) = (expected.as_bytes(), given.as_bytes());
    expected.len() == given.len()
        && expected
            .iter()
            .zip(given)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// GET /tips?page=&limit= - Returns a page of deposits, newest first
pub async fn get_tips(
    State(state): State<AppState>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> LedgerResult<TipsResponse> {
    let params = pagination(params)?;
    let page = state.ledger.page(params.page, params.limit)?;
    Ok(many(state.ledger.list_all(page).await?))
}

/// POST /tips - Records a new pending deposit
pub async fn create_tip(
    State(state): State<AppState>,
    payload: Result<Json<CreateTipRequest>, JsonRejection>,
) -> LedgerResult<(StatusCode, TipResponse)> {
    let new = NewTipDeposit::try_from(body(payload)?)?;
    let deposit = state.ledger.create(new).await?;
    Ok((StatusCode::CREATED, one(deposit)))
}

/// GET /tips/{deposit_id}
pub async fn get_tip_by_id(
    State(state): State<AppState>,
    Path(deposit_id): Path<String>,
) -> LedgerResult<TipResponse> {
    Ok(one(state.ledger.get_by_id(&deposit_id).await?))
}

/// GET /tips/sender/{sender} - Deposits paid by a chain address
pub async fn get_tips_by_sender(
    State(state): State<AppState>,
    Path(sender): Path<String>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> LedgerResult<TipsResponse> {
    let params = pagination(params)?;
    let page = state.ledger.page(params.page, params.limit)?;
    Ok(many(state.ledger.list_by_sender(&sender, page).await?))
}

/// GET /tips/recipient/{nostr_recipient} - Deposits addressed to a recipient key
pub async fn get_tips_by_recipient(
    State(state): State<AppState>,
    Path(nostr_recipient): Path<String>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> LedgerResult<TipsResponse> {
    let params = pagination(params)?;
    let page = state.ledger.page(params.page, params.limit)?;
    Ok(many(
        state
            .ledger
            .list_by_recipient(&nostr_recipient, page)
            .await?,
    ))
}

/// POST /tips/{deposit_id}/claim
pub async fn claim_tip(
    State(state): State<AppState>,
    Path(deposit_id): Path<String>,
    payload: Result<Json<ClaimTipRequest>, JsonRejection>,
) -> LedgerResult<TipResponse> {
    let request = body(payload)?;
    Ok(one(state.ledger.claim(&deposit_id, &request.claimant).await?))
}

/// POST /tips/{deposit_id}/cancel
pub async fn cancel_tip(
    State(state): State<AppState>,
    Path(deposit_id): Path<String>,
    payload: Result<Json<CancelTipRequest>, JsonRejection>,
) -> LedgerResult<TipResponse> {
    let request = body(payload)?;
    let actor = Actor::Party(request.requester);
    Ok(one(state.ledger.cancel(&deposit_id, &actor).await?))
}

/// POST /tips/{deposit_id}/recipient - Records the resolved payee address
pub async fn resolve_tip_recipient(
    State(state): State<AppState>,
    Path(deposit_id): Path<String>,
    payload: Result<Json<ResolveRecipientRequest>, JsonRejection>,
) -> LedgerResult<TipResponse> {
    let request = body(payload)?;
    Ok(one(
        state
            .ledger
            .resolve_recipient(&deposit_id, &request.starknet_recipient)
            .await?,
    ))
}

/// POST /tips/expire - Cancels stale pending deposits; requires the admin bearer token
pub async fn expire_tips(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LedgerResult<Json<DataResponse<ExpiredTipsResponse>>> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let authorized = matches!(
        (state.admin_token.as_deref(), presented),
        (Some(expected), Some(given)) if tokens_match(expected, given)
    );
    if !authorized {
        tracing::warn!("Rejected unauthenticated expiry request");
        return Err(LedgerError::Unauthorized(
            "expire tip deposits".to_string(),
        ));
    }

    let cancelled = state.ledger.expire_stale().await?;
    Ok(Json(DataResponse::new(ExpiredTipsResponse {
        count: cancelled.len(),
        cancelled,
    })))
}
