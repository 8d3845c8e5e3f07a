use axum::extract::rejection::BytesRejection;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{FieldErrorKind, ValidationErrors};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("could not parse request body as JSON: {0}")]
    JsonParse(String),
    #[error("{0}")]
    MalformedBody(String),
    #[error("request body too large: {0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("model '{0}' not found")]
    ModelNotFound(String),
    #[error("no route for {0}")]
    RouteNotFound(String),
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed { method: Method, path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub param: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::JsonParse(_) | ServiceError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Validation(errors) => match errors.primary().map(|e| e.kind) {
                Some(FieldErrorKind::UnknownModel) => StatusCode::NOT_FOUND,
                Some(FieldErrorKind::OutOfRange) => StatusCode::UNPROCESSABLE_ENTITY,
                Some(FieldErrorKind::MissingField | FieldErrorKind::TypeMismatch) | None => {
                    StatusCode::BAD_REQUEST
                }
            },
            ServiceError::ModelNotFound(_) | ServiceError::RouteNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (kind, param, code) = match self {
            ServiceError::JsonParse(_) => ("json_parse_error", None, "json_parse_error"),
            ServiceError::MalformedBody(_) => ("invalid_request_error", None, "malformed_body"),
            ServiceError::PayloadTooLarge(_) => {
                ("invalid_request_error", None, "payload_too_large")
            }
            ServiceError::Validation(errors) => match errors.primary() {
                Some(primary) => {
                    let kind = if primary.kind == FieldErrorKind::UnknownModel {
                        "not_found_error"
                    } else {
                        "invalid_request_error"
                    };
                    (kind, Some(primary.field.clone()), primary.kind.code())
                }
                None => ("invalid_request_error", None, "malformed_body"),
            },
            ServiceError::ModelNotFound(_) => {
                ("not_found_error", Some("model".to_string()), "model_not_found")
            }
            ServiceError::RouteNotFound(_) => ("not_found_error", None, "route_not_found"),
            ServiceError::MethodNotAllowed { .. } => {
                ("invalid_request_error", None, "method_not_allowed")
            }
        };

        ErrorBody {
            message: self.to_string(),
            kind: kind.to_string(),
            param,
            code: code.to_string(),
        }
    }
}

impl From<BytesRejection> for ServiceError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServiceError::PayloadTooLarge(rejection.body_text())
        } else {
            ServiceError::MalformedBody(rejection.body_text())
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(%status, error = %self, "request rejected");

        let envelope = ErrorEnvelope { error: self.body() };
        (status, axum::Json(envelope)).into_response()
    }
}
