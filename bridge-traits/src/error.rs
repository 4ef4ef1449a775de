use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Connection not available: {0}")]
    NotAvailable(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Response decoding failed: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
