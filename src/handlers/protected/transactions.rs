// handlers/protected/transactions.rs - /api/transactions

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Transaction;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::transaction_service::{NewTransaction, TransactionFilter, TransactionPatch, TransactionService};
use crate::services::user_service::UserService;

/// GET /api/transactions?accountId=&category=&from=&to=&limit=
pub async fn transactions_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<TransactionFilter>,
) -> ApiResult<Vec<Transaction>> {
    let transactions = TransactionService::new(state.pool.clone()).list(auth.user_id, &filter).await?;
    Ok(ApiResponse::success(transactions))
}

/// POST /api/transactions - converts to the home currency and moves balances
pub async fn transactions_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<NewTransaction>,
) -> ApiResult<Transaction> {
    let home = UserService::new(state.pool.clone()).home_currency(auth.user_id).await?;
    let transaction = TransactionService::new(state.pool.clone())
        .create(auth.user_id, home, body)
        .await?;
    Ok(ApiResponse::created(transaction))
}

/// GET /api/transactions/:id
pub async fn transaction_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Transaction> {
    let transaction = TransactionService::new(state.pool.clone()).get(auth.user_id, id).await?;
    ApiResponse::found(transaction, "Transaction")
}

/// PATCH /api/transactions/:id - descriptive fields only
pub async fn transaction_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransactionPatch>,
) -> ApiResult<Transaction> {
    let transaction = TransactionService::new(state.pool.clone()).update(auth.user_id, id, body).await?;
    ApiResponse::found(transaction, "Transaction")
}

/// DELETE /api/transactions/:id - reverses the balance effects
pub async fn transaction_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let removed = TransactionService::new(state.pool.clone()).delete(auth.user_id, id).await?;
    ApiResponse::<()>::deleted(removed, "Transaction")
}
