// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagineError {
    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ImagineError {
    fn from(e: serde_json::Error) -> Self {
        ImagineError::Serialization(e.to_string())
    }
}
