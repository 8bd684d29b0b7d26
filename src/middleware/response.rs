use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;

/// Success envelope: `{ "success": true, "data": ... }`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    /// 201 Created
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    /// 200 with the value, or 404 naming `what` when the lookup found nothing.
    pub fn found(data: Option<T>, what: &str) -> ApiResult<T> {
        data.map(Self::success)
            .ok_or_else(|| ApiError::not_found(format!("{} not found", what)))
    }

    /// 204 No Content
    pub fn no_content() -> ApiResponse<()> {
        ApiResponse::with_status((), StatusCode::NO_CONTENT)
    }
}

impl ApiResponse<()> {
    /// 204 when something was removed, 404 naming `what` otherwise.
    pub fn deleted(removed: bool, what: &str) -> ApiResult<()> {
        if removed {
            Ok(Self::no_content())
        } else {
            Err(ApiError::not_found(format!("{} not found", what)))
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return ApiError::internal_server_error("Failed to serialize response data").into_response();
            }
        };

        (status, Json(json!({ "success": true, "data": data_value }))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_maps_missing_to_404() {
        let ok = ApiResponse::found(Some(3), "Task").unwrap();
        assert_eq!(ok.data, 3);
        let missing = ApiResponse::<i32>::found(None, "Task").unwrap_err();
        assert_eq!(missing.status_code(), 404);
        assert_eq!(missing.message(), "Task not found");
    }

    #[test]
    fn deleted_is_204_or_404() {
        let ok = ApiResponse::<()>::deleted(true, "Account").unwrap();
        assert_eq!(ok.into_response().status(), StatusCode::NO_CONTENT);
        assert_eq!(ApiResponse::<()>::deleted(false, "Account").unwrap_err().status_code(), 404);
    }

    #[test]
    fn created_sets_status() {
        let response = ApiResponse::created(serde_json::json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
