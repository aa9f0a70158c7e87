//! Application-wide error taxonomy.
//!
//! Component errors (token, password, post, slug, storage) convert into
//! [`AppError`], which renders as `application/problem+json` at the HTTP edge
//! and as a coded GraphQL error inside the graph layer.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

/// RFC 7807 problem document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<Uuid>,
}

impl AppError {
    pub fn unauthorized() -> Self {
        AppError::Unauthorized("unauthorized request".into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Logs internal failures and hands back the code the client can quote.
    fn track(&self) -> Option<Uuid> {
        match self {
            AppError::Internal(e) => {
                let tracking_code = Uuid::new_v4();
                tracing::error!(error = ?e, %tracking_code, "internal error");
                Some(tracking_code)
            }
            _ => None,
        }
    }

    pub fn to_problem(&self) -> Problem {
        let status = self.status();
        Problem {
            kind: "about:blank",
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: self.to_string(),
            tracking_code: self.track(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let problem = self.to_problem();
        (
            self.status(),
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(problem),
        )
            .into_response()
    }
}

impl async_graphql::ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        let tracking_code = self.track();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.code());
            if let Some(code) = tracking_code {
                e.set("trackingCode", code.to_string());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::ErrorExtensions;

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::from(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let problem = err.to_problem();
        assert_eq!(problem.status, 500);
        assert_eq!(problem.detail, "internal server error");
        assert!(problem.tracking_code.is_some());
    }

    #[test]
    fn problem_serializes_with_rfc7807_keys() {
        let problem = AppError::NotFound("post with uuid 'x' not found".into()).to_problem();
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["type"], "about:blank");
        assert_eq!(json["title"], "Not Found");
        assert_eq!(json["status"], 404);
        assert!(json.get("trackingCode").is_none());
    }

    #[test]
    fn graphql_error_carries_code() {
        let err = AppError::unauthorized().extend();
        let ext = err.extensions.expect("extensions");
        assert_eq!(
            ext.get("code"),
            Some(&async_graphql::Value::from("UNAUTHORIZED"))
        );
        assert_eq!(err.message, "unauthorized request");
    }
}
