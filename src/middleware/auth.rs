use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::TokenType;
use crate::error::ApiError;
use crate::services::api_key_service::ApiKeyService;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Jwt,
    ApiKey,
}

/// Authenticated caller, injected into request extensions.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub auth_type: AuthType,
}

/// Bearer JWT or `X-API-Key` authentication for every protected route.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate_headers(&state, &headers)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header or X-API-Key"))?;

    debug!("Authenticated user {} via {:?}", user.user_id, user.auth_type);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// `Ok(None)` when the request carries no credentials at all; an error when
/// it carries invalid ones.
pub async fn authenticate_headers(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>, ApiError> {
    if let Some(token) = extract_bearer(headers)? {
        let claims = state.jwt.validate(&token, TokenType::Access)?;
        return Ok(Some(AuthUser {
            user_id: claims.user_id()?,
            email: claims.email,
            auth_type: AuthType::Jwt,
        }));
    }

    match extract_api_key(headers)? {
        Some(key) => authenticate_api_key(state, &key).await.map(Some),
        None => Ok(None),
    }
}

pub async fn authenticate_api_key(state: &AppState, key: &str) -> Result<AuthUser, ApiError> {
    let owner = ApiKeyService::new(state.pool.clone())
        .validate(key)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid API key"))?;
    Ok(AuthUser {
        user_id: owner.user_id,
        email: owner.email,
        auth_type: AuthType::ApiKey,
    })
}

/// Bearer token from the Authorization header, if one is present.
fn extract_bearer(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        Some(_) => Err(ApiError::unauthorized("Empty JWT token")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}

fn extract_api_key(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(header) = headers.get(API_KEY_HEADER) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid X-API-Key header"))?
        .trim();
    if value.is_empty() {
        return Err(ApiError::unauthorized("Empty API key"));
    }
    Ok(Some(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers).unwrap(), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers).unwrap().as_deref(), Some("abc.def.ghi"));

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(extract_bearer(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer(&headers).is_err());
    }

    #[test]
    fn api_key_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers).unwrap(), None);

        headers.insert("X-API-Key", HeaderValue::from_static(" lifeos_abcd1234_secret "));
        assert_eq!(
            extract_api_key(&headers).unwrap().as_deref(),
            Some("lifeos_abcd1234_secret")
        );
    }
}
