use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("error: {0}")]
    Error(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Error(format!("{}", err))
    }
}

/// An inbound frame that could not be turned into a [`Message`].
///
/// [`Message`]: crate::message::Message
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid frame: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("client registry is full ({0} clients)")]
    Full(usize),

    #[error("no unused client id available")]
    IdSpaceExhausted,
}
