use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dashboard background tasks already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, DispatchError>;
