// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps the pool's and providers' error taxonomy to HTTP responses. This is
//! the one place in the binary that knows about status codes -- every
//! handler returns `Result<_, ApiError>` and lets `IntoResponse` do the
//! translation, per the error-kind table the core crate defines.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use oj_core::ErrorKind;
use oj_pool::PoolError;
use oj_providers::ProviderError;
use serde_json::json;

pub struct ApiError {
    kind: ErrorKind,
    message: String,
    backend_detail: Option<String>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Validation, message: message.into(), backend_detail: None }
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        let kind = err.kind();
        let backend_detail = match &err {
            PoolError::Provider(ProviderError::BackendFailure(detail)) => Some(detail.clone()),
            _ => None,
        };
        Self { kind, message: err.to_string(), backend_detail }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        let kind = match &err {
            ProviderError::Timeout => ErrorKind::Timeout,
            ProviderError::Cancelled => ErrorKind::Cancelled,
            ProviderError::ConfigMissing(_) => ErrorKind::Validation,
            _ => ErrorKind::BackendFailure,
        };
        let backend_detail = match &err {
            ProviderError::BackendFailure(detail) => Some(detail.clone()),
            _ => None,
        };
        Self { kind, message: err.to_string(), backend_detail }
    }
}

/// Every error kind the transport is told about maps to exactly one status
/// code; nothing here ever matches on message text.
fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::CapacityExceeded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::PolicyDenied => StatusCode::FORBIDDEN,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Cancelled => StatusCode::CONFLICT,
        ErrorKind::BackendFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        if !matches!(self.kind, ErrorKind::Internal) {
            tracing::warn!(kind = %self.kind, message = %self.message, "request failed");
        } else {
            tracing::error!(message = %self.message, "request failed");
        }
        let mut body = json!({
            "kind": self.kind,
            "message": self.message,
        });
        if let Some(detail) = self.backend_detail {
            body["backend_detail"] = json!(detail);
        }
        (status, Json(body)).into_response()
    }
}
