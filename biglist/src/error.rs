use thiserror::Error;

use crate::store::ContainerId;

/// Everything the list, its stores and its caches can fail with.
#[derive(Error, Debug)]
pub enum BigListError
{
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("capacity exceeded: {requested} items requested, capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("leaf is already linked into a chain")]
    AlreadyLinked,

    #[error("content for container {0:?} is neither resident nor persisted")]
    NotFound(ContainerId),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode block: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode block: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("failed to parse profile: {0}")]
    Profile(#[from] serde_yml::Error),
}

pub type Result<T, E = BigListError> = std::result::Result<T, E>;

impl BigListError
{
    pub(crate) fn index(index: usize, len: usize) -> Self
    {
        BigListError::IndexOutOfRange { index, len }
    }

    pub(crate) fn capacity(requested: usize, capacity: usize) -> Self
    {
        BigListError::CapacityExceeded { requested, capacity }
    }
}
