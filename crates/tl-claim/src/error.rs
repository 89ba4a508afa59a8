use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),

    #[error("unknown validation level: {0:?}")]
    UnknownValidationLevel(String),
}
