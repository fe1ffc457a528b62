use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_helpers::AppError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::models::ValidationErrorBody;

#[derive(Debug, Error)]
pub enum ProductoError {
    /// Field errors, already rendered as `El campo <field> <message>`
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Producto not found: {0}")]
    NotFound(String),

    #[error("Malformed JSON body: {0}")]
    Json(#[from] JsonRejection),

    /// Unreadable multipart body, with the status the extractor chose
    #[error("Multipart error: {message}")]
    Multipart { status: StatusCode, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductoResult<T> = Result<T, ProductoError>;

/// Render field errors as `El campo <field> <message>`, sorted by field name.
///
/// Fields listed in `skip` are left out, for callers that already reported
/// a more specific error for them.
pub fn field_messages(errors: &ValidationErrors, skip: &[&str]) -> Vec<(String, String)> {
    let mut messages: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .filter(|(field, _)| !skip.contains(&&**field))
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                (field.to_string(), format!("El campo {field} {message}"))
            })
        })
        .collect();

    messages.sort();
    messages
}

impl From<ValidationErrors> for ProductoError {
    fn from(errors: ValidationErrors) -> Self {
        ProductoError::Validation(
            field_messages(&errors, &[])
                .into_iter()
                .map(|(_, message)| message)
                .collect(),
        )
    }
}

/// Convert ProductoError to AppError for the shared 4xx/5xx error body
impl From<ProductoError> for AppError {
    fn from(err: ProductoError) -> Self {
        match err {
            ProductoError::Validation(errors) => AppError::BadRequest(errors.join("; ")),
            ProductoError::NotFound(id) => AppError::NotFound(format!("Producto {id} not found")),
            ProductoError::Json(rejection) => AppError::JsonExtractorRejection(rejection),
            ProductoError::Multipart { status, message } => {
                AppError::Multipart { status, message }
            }
            ProductoError::Database(msg) => AppError::Database(msg),
            ProductoError::Storage(msg) => {
                AppError::InternalServerError(format!("storage: {msg}"))
            }
            ProductoError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductoError {
    fn into_response(self) -> Response {
        match self {
            ProductoError::Validation(errors) => {
                tracing::info!(?errors, "Producto payload rejected");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ValidationErrorBody::new(errors)),
                )
                    .into_response()
            }
            ProductoError::NotFound(id) => {
                tracing::debug!(producto_id = %id, "Producto not found");
                StatusCode::NOT_FOUND.into_response()
            }
            other => AppError::from(other).into_response(),
        }
    }
}

impl From<mongodb::error::Error> for ProductoError {
    fn from(err: mongodb::error::Error) -> Self {
        ProductoError::Database(err.to_string())
    }
}

impl From<std::io::Error> for ProductoError {
    fn from(err: std::io::Error) -> Self {
        ProductoError::Storage(err.to_string())
    }
}

impl From<MultipartError> for ProductoError {
    fn from(err: MultipartError) -> Self {
        ProductoError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<MultipartRejection> for ProductoError {
    fn from(rejection: MultipartRejection) -> Self {
        ProductoError::Multipart {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}
