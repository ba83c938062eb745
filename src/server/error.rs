use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::feed::{EncodeError, ParseError};
use crate::source::FetchError;

/// Everything that can go wrong while serving one feed request.
///
/// Each variant maps to a plain-text error response; no partial feed is
/// ever written.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("fetch {locator:?}: {error}")]
    Fetch {
        locator: String,
        #[source]
        error: FetchError,
    },

    #[error("parse: {0}")]
    Parse(#[from] ParseError),

    #[error("render {format}: {error}")]
    Encode {
        format: &'static str,
        #[source]
        error: EncodeError,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Fetch { error, .. } => StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{self}\n"),
        )
            .into_response()
    }
}
