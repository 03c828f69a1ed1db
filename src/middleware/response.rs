use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Handler output. The payload is the whole body: lists go out as bare
/// arrays and records as bare objects.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    body: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(body: T) -> Self {
        Self { status: StatusCode::OK, body: Some(body) }
    }

    pub fn created(body: T) -> Self {
        Self { status: StatusCode::CREATED, body: Some(body) }
    }
}

impl ApiResponse<()> {
    pub fn no_content() -> Self {
        Self { status: StatusCode::NO_CONTENT, body: None }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
