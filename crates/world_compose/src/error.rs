//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Only
//! malformed input is reported through it: an empty terrain grid, an empty or inconsistent
//! asset catalog, or an invalid configuration. Everything else that can go wrong during a
//! composition run degrades to sparser output plus a warning.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("terrain grid is empty")]
    EmptyTerrain,

    #[error("asset catalog is empty")]
    EmptyCatalog,

    #[error("duplicate asset id '{id}'")]
    DuplicateAsset { id: String },

    #[error("unknown asset '{id}'")]
    UnknownAsset { id: String },

    #[error("invalid asset '{id}': {reason}")]
    InvalidAsset { id: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
