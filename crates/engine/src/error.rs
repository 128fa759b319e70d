//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidInput`] thrown when a caller supplies a malformed value
//!   (empty user id, unknown export format, bad date range, bad threshold...).
//! - [`KeyNotFound`] thrown when a layout, pack, user or file is missing.
//! - [`NoExportableComponents`] thrown when every layout item is empty.
//! - [`InsufficientBalance`] thrown when a paid download cannot be covered.
//! - [`Unavailable`] thrown when the filesystem cannot be read or written.
//!
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`NoExportableComponents`]: EngineError::NoExportableComponents
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`Unavailable`]: EngineError::Unavailable
use sea_orm::DbErr;
use thiserror::Error;

use crate::Credits;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unsupported component type: {0}")]
    UnsupportedComponentType(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("No components with data found, cannot generate empty export")]
    NoExportableComponents,
    #[error("Insufficient balance: required {required}, available {balance}")]
    InsufficientBalance { required: Credits, balance: Credits },
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Unavailable(value.to_string())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::UnsupportedComponentType(a), Self::UnsupportedComponentType(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::NoExportableComponents, Self::NoExportableComponents) => true,
            (
                Self::InsufficientBalance {
                    required: r1,
                    balance: b1,
                },
                Self::InsufficientBalance {
                    required: r2,
                    balance: b2,
                },
            ) => r1 == r2 && b1 == b2,
            (Self::Unavailable(a), Self::Unavailable(b)) => a == b,
            (Self::InternalInvariant(a), Self::InternalInvariant(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
