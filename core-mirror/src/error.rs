use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Model configuration missing required field: {0}")]
    MissingConfig(&'static str),

    #[error("Model '{0}' is already registered")]
    DuplicateModel(String),

    #[error("Entity carries no value under identity attribute '{0}'")]
    MissingIdentity(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("Unknown event name: {0}")]
    UnknownEvent(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, MirrorError>;
