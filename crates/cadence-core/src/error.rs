use thiserror::Error;

use crate::types::NodeId;

#[derive(Debug, Error)]
pub enum CadenceError {
    // Graph errors
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    // Library errors
    #[error("Cadence not found: {0}")]
    CadenceNotFound(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
