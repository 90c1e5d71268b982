//! Error types for the browser harness

use crate::cdp::CDPError;
use domwalk::DomError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(transparent)]
    Cdp(#[from] CDPError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not connected")]
    NotConnected,

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("No active session")]
    NoActiveSession,

    /// The page threw while running one of our scripts
    #[error("Script error: {0}")]
    Script(String),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
