// shared/src/lib.rs

/// Error taxonomy shared by every store adapter and the HTTP layer.
///
/// Durable adapters are the only source of authoritative `NotFound` and
/// `AlreadyExists`. Anything a cache adapter returns is a soft miss.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
