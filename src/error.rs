use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Dataset or artifact could not be brought up. Degrades the dependent
/// endpoints, never the process.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv {path} at line {line}: {reason}")]
    Csv {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("invalid model artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("artifact lists {features} features but {coefficients} coefficients")]
    SchemaMismatch { features: usize, coefficients: usize },

    #[error("artifact feature {0:?} cannot be derived from a prediction request")]
    UnsupportedFeature(String),

    #[error("artifact lists feature {0:?} more than once")]
    DuplicateFeature(String),

    #[error("no model artifact and no dataset available to predict from")]
    NoPredictionSource,
}

/// Request rejected before it reaches the predictor.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be greater than 0")]
    NonPositive { field: &'static str },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("missing field {field}")]
    Missing { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("invalid request body: {0}")]
    Body(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_client_error() {
        let err = ApiError::from(ValidationError::NonPositive { field: "sqft" });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "sqft must be greater than 0");
    }

    #[test]
    fn unavailable_maps_to_server_error() {
        let err = ApiError::Unavailable("House data not loaded".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
