use std::collections::BTreeMap;
use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::{self, ContentType}, StatusCode},
    HttpResponse
};
use derive_more::Display;
use serde::Serialize;
use validator::ValidationErrors;

use crate::constants::{DISPATCH_FAILED_MESSAGE, RATE_LIMITED_MESSAGE, VALIDATION_FAILED_MESSAGE};

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    RateLimited { retry_after_secs: u64 },
    DispatchError(MailError),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited, retry after {}s", retry_after_secs)
            }
            AppError::DispatchError(err) => write!(f, "Mail dispatch failed: {}", err),
            AppError::InternalError(msg) => write!(f, "Internal server error: {}", msg)
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        builder.insert_header(ContentType::json());

        match self {
            AppError::ValidationError(errors) => {
                builder.json(serde_json::json!({
                    "success": false,
                    "message": VALIDATION_FAILED_MESSAGE,
                    "errors": field_error_map(errors),
                }))
            }
            AppError::RateLimited { retry_after_secs } => {
                builder
                    .insert_header((header::RETRY_AFTER, retry_after_secs.to_string()))
                    .json(serde_json::json!({
                        "success": false,
                        "message": RATE_LIMITED_MESSAGE,
                    }))
            }
            // Transport details stay in the server log.
            AppError::DispatchError(_) | AppError::InternalError(_) => {
                builder.json(serde_json::json!({
                    "success": false,
                    "message": DISPATCH_FAILED_MESSAGE,
                }))
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::DispatchError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Keeps the first message per field, keyed by field name.
pub fn field_error_map(errors: &[FieldError]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for error in errors {
        map.entry(error.field.clone())
            .or_insert_with(|| error.message.clone());
    }
    map
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(|e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Ongeldige waarde.".to_string()),
                })
            })
            .collect();

        field_errors.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationError(field_errors)
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::DispatchError(err)
    }
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum MailError {
    #[display("Invalid mail address: {_0}")]
    InvalidAddress(String),

    #[display("Failed to build message: {_0}")]
    Build(String),

    #[display("Transport rejected message: {_0}")]
    Transport(String),

    #[display("Transport timed out after {_0}s")]
    Timeout(u64),

    #[display("Mail queue is full")]
    QueueFull,

    #[display("Mail queue is closed")]
    QueueClosed,
}

impl std::error::Error for MailError {}

impl MailError {
    /// Whether sending the same message again can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, MailError::Transport(_) | MailError::Timeout(_))
    }
}

#[derive(Debug, Display)]
pub enum RateLimitError {
    #[display("Redis connection failed: {_0}")]
    RedisConnection(String),

    #[display("Redis operation failed: {_0}")]
    RedisOperation(String),
}

impl std::error::Error for RateLimitError {}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn validation_errors_map_to_unprocessable_entity() {
        let mut errors = ValidationErrors::new();
        errors.add("email", ValidationError::new("email").with_message("Ongeldig e-mailadres.".into()));
        errors.add("name", ValidationError::new("required").with_message("Vul je naam in.".into()));

        let app_error = AppError::from(errors);
        assert_eq!(app_error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        match app_error {
            AppError::ValidationError(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["email", "name"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after_secs: 42 }.error_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap().to_str().unwrap(),
            "42"
        );
    }

    #[test]
    fn dispatch_error_is_server_error() {
        let err = AppError::from(MailError::Transport("554 relay denied".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn only_transport_and_timeout_errors_are_transient() {
        assert!(MailError::Transport("421".into()).is_transient());
        assert!(MailError::Timeout(10).is_transient());
        assert!(!MailError::InvalidAddress("a.@b.nl".into()).is_transient());
        assert!(!MailError::Build("no body".into()).is_transient());
        assert!(!MailError::QueueFull.is_transient());
    }

    #[test]
    fn field_error_map_keeps_first_message() {
        let errors = vec![
            FieldError { field: "email".into(), message: "first".into() },
            FieldError { field: "email".into(), message: "second".into() },
        ];
        let map = field_error_map(&errors);
        assert_eq!(map.get("email").map(String::as_str), Some("first"));
    }
}
