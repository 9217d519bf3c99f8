use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The error kinds defined by the naming protocol. These are the only
/// vocabulary callers (naming server, storage server, client) need to agree
/// on across the wire; they carry no backtrace or source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    BadPath,
    BadArg,
    NotFound,
    IllegalState,
    OutOfRange,
    Stopped,
    TransportFailure,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadPath | ErrorKind::BadArg => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::IllegalState => StatusCode::CONFLICT,
            ErrorKind::OutOfRange => StatusCode::RANGE_NOT_SATISFIABLE,
            ErrorKind::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::TransportFailure => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ErrorKind::BadArg,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::IllegalState,
            StatusCode::RANGE_NOT_SATISFIABLE => ErrorKind::OutOfRange,
            StatusCode::SERVICE_UNAVAILABLE => ErrorKind::Stopped,
            StatusCode::BAD_GATEWAY => ErrorKind::TransportFailure,
            _ => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::BadPath => "BAD_PATH",
            ErrorKind::BadArg => "BAD_ARG",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::IllegalState => "ILLEGAL_STATE",
            ErrorKind::OutOfRange => "OUT_OF_RANGE",
            ErrorKind::Stopped => "STOPPED",
            ErrorKind::TransportFailure => "TRANSPORT_FAILURE",
            ErrorKind::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

/// An error carrying one of the protocol's error kinds plus a human message.
/// This is what facade operations return, what gets serialized over the
/// wire, and what RPC clients reconstruct on the other end.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn bad_path(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadPath, message)
    }

    pub fn bad_arg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadArg, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalState, message)
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfRange, message)
    }

    pub fn stopped() -> Self {
        Self::new(ErrorKind::Stopped, "the server is shutting down")
    }

    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        tracing::debug!(kind = %self.kind, message = %self.message, "request failed");
        (status, Json(self)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
