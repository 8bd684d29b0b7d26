// handlers/protected/accounts.rs - /api/accounts

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Account;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::account_service::{AccountBalance, AccountPatch, AccountService, NewAccount};
use crate::services::user_service::UserService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    pub include_inactive: Option<bool>,
}

/// GET /api/accounts - active accounts unless includeInactive=true
pub async fn accounts_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Vec<Account>> {
    let accounts = AccountService::new(state.pool.clone())
        .list(auth.user_id, query.include_inactive.unwrap_or(false))
        .await?;
    Ok(ApiResponse::success(accounts))
}

/// POST /api/accounts
pub async fn accounts_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<NewAccount>,
) -> ApiResult<Account> {
    let account = AccountService::new(state.pool.clone()).create(auth.user_id, body).await?;
    Ok(ApiResponse::created(account))
}

/// GET /api/accounts/:id
pub async fn account_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Account> {
    let account = AccountService::new(state.pool.clone()).get(auth.user_id, id).await?;
    ApiResponse::found(account, "Account")
}

/// PATCH /api/accounts/:id
pub async fn account_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<AccountPatch>,
) -> ApiResult<Account> {
    let account = AccountService::new(state.pool.clone()).update(auth.user_id, id, body).await?;
    ApiResponse::found(account, "Account")
}

/// DELETE /api/accounts/:id - soft delete
pub async fn account_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let removed = AccountService::new(state.pool.clone()).deactivate(auth.user_id, id).await?;
    ApiResponse::<()>::deleted(removed, "Account")
}

/// GET /api/accounts/:id/balance - balance plus its home-currency value
pub async fn account_balance_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<AccountBalance> {
    let home = UserService::new(state.pool.clone()).home_currency(auth.user_id).await?;
    let balance = AccountService::new(state.pool.clone()).balance(auth.user_id, id, home).await?;
    ApiResponse::found(balance, "Account")
}
