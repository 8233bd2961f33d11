use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use viewline_core::{RatingError, RedeemError, SessionError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The request was well-formed but its values are unacceptable
    #[error("{0}")]
    Validation(String),
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    /// Refused as a fraud signal, the binding stays untouched
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<RatingError> for ServerError {
    fn from(value: RatingError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<RedeemError> for ServerError {
    fn from(value: RedeemError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<SessionError> for ServerError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::InvalidSession(session_id) => Self::NotFound {
                resource: "session",
                identifier: session_id,
            },
        }
    }
}
