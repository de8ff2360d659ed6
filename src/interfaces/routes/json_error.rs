use actix_web::{
    web,
    http::StatusCode,
    ResponseError,
    HttpResponse,
    error::{JsonPayloadError, UrlencodedError},
};
use serde_json::json;

use crate::{
    constants::CONTACT_PAYLOAD_LIMIT,
    errors::{AppError, FieldError},
};

/// Extractor settings shared by the JSON and url-encoded contact payloads.
/// Unreadable bodies answer in the same shape as field validation errors.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(CONTACT_PAYLOAD_LIMIT));

    cfg.app_data(
        web::JsonConfig::default()
            .limit(CONTACT_PAYLOAD_LIMIT)
            .error_handler(|err, _req| {
                tracing::info!("Rejected JSON payload: {}", err);
                PayloadError::from(err).into()
            }),
    );

    cfg.app_data(
        web::FormConfig::default()
            .limit(CONTACT_PAYLOAD_LIMIT)
            .error_handler(|err, _req| {
                tracing::info!("Rejected form payload: {}", err);
                PayloadError::from(err).into()
            }),
    );
}

#[derive(Debug)]
pub enum PayloadError {
    Unreadable(String),
    TooLarge(String),
    UnsupportedMediaType(String),
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::Unreadable(msg)
            | PayloadError::TooLarge(msg)
            | PayloadError::UnsupportedMediaType(msg) => write!(f, "{}", msg),
        }
    }
}

impl ResponseError for PayloadError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayloadError::Unreadable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PayloadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            PayloadError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            PayloadError::Unreadable(msg) => AppError::ValidationError(vec![FieldError {
                field: "form".to_string(),
                message: msg.clone(),
            }])
            .error_response(),
            PayloadError::TooLarge(msg) | PayloadError::UnsupportedMediaType(msg) => {
                HttpResponse::build(self.status_code()).json(json!({
                    "success": false,
                    "message": msg,
                }))
            }
        }
    }
}

impl From<JsonPayloadError> for PayloadError {
    fn from(err: JsonPayloadError) -> Self {
        match err {
            JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                PayloadError::TooLarge("Het bericht is te groot.".to_string())
            }
            JsonPayloadError::ContentType => {
                PayloadError::UnsupportedMediaType("Verstuur het formulier als JSON of formulierdata.".to_string())
            }
            _ => PayloadError::Unreadable("Het formulier kon niet worden gelezen.".to_string()),
        }
    }
}

impl From<UrlencodedError> for PayloadError {
    fn from(err: UrlencodedError) -> Self {
        match err {
            UrlencodedError::Overflow { .. } => {
                PayloadError::TooLarge("Het bericht is te groot.".to_string())
            }
            UrlencodedError::ContentType => {
                PayloadError::UnsupportedMediaType("Verstuur het formulier als JSON of formulierdata.".to_string())
            }
            _ => PayloadError::Unreadable("Het formulier kon niet worden gelezen.".to_string()),
        }
    }
}
