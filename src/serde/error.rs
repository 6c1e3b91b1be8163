//! Errors raised while converting between Rust types and [`Value`](crate::Value).

use std::fmt::Display;

use thiserror::Error;

use crate::error::{DecodeError, EncodeError};

#[derive(Debug, Error)]
pub enum SerdeError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl serde::ser::Error for SerdeError {
    fn custom<T: Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}

impl serde::de::Error for SerdeError {
    fn custom<T: Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}
