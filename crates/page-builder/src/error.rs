use crate::block::BlockId;
use crate::schema::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(ValidationError),

    #[error("UnsupportedBlockType: {type_tag}")]
    UnsupportedBlockType { type_tag: String },

    #[error("NotFound: block {id}")]
    NotFound { id: BlockId },

    #[error("NotFound: page {onelink}")]
    PageNotFound { onelink: String },

    #[error("IndexOutOfRange: {index} not in [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Conflict: page {onelink} changed since it was loaded")]
    Conflict { onelink: String },

    #[error("Store error: {msg}")]
    Store { msg: String },

    #[error("Lookup error: {msg}")]
    Lookup { msg: String },

    #[error("{0:?}")]
    AnyError(anyhow::Error),
}

impl Error {
    pub fn unsupported(type_tag: &str) -> Self {
        Self::UnsupportedBlockType {
            type_tag: type_tag.to_string(),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::AnyError(e)
    }
}
