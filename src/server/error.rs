//! HTTP-facing errors

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::content::ContentError;
use crate::data::DataError;
use crate::media::MediaError;
use crate::paths::PathError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn forbidden() -> Self {
        AppError::Forbidden("You do not have permission to do that.".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                "Something went wrong. The error has been logged.".to_string()
            }
            other => other.to_string(),
        };

        let title = status.canonical_reason().unwrap_or("Error");
        let body = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{code} {title}</title></head>\
             <body><h1>{code} {title}</h1><p>{message}</p></body></html>",
            code = status.as_u16(),
            title = title,
            message = tera::escape_html(&message),
        );
        (status, Html(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        if let Some(e) = error.downcast_ref::<ContentError>() {
            return match e {
                ContentError::NotFound(..) => AppError::NotFound,
                other => AppError::BadRequest(other.to_string()),
            };
        }
        if let Some(e) = error.downcast_ref::<PathError>() {
            if let PathError::Traversal(_) = e {
                return AppError::BadRequest(e.to_string());
            }
        }
        match error.downcast::<DataError>() {
            Ok(e) => e.into(),
            Err(error) => AppError::Internal(error),
        }
    }
}

impl From<DataError> for AppError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::NotFound { .. } => AppError::NotFound,
            DataError::Invalid { message, .. } => AppError::BadRequest(message),
            e @ DataError::Duplicate { .. } => AppError::BadRequest(e.to_string()),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<PathError> for AppError {
    fn from(error: PathError) -> Self {
        match error {
            e @ PathError::Traversal(_) => AppError::BadRequest(e.to_string()),
            e if e.is_not_found() => AppError::NotFound,
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::NotFound(_) => AppError::NotFound,
            e @ MediaError::TooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            MediaError::Path(e) => e.into(),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
