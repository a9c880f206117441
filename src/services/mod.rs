// src/services/mod.rs
pub mod classify;
pub mod gemini;
pub mod generation;
pub mod image_processor;

pub use classify::{ErrorKind, RemoteError};
pub use gemini::{GeminiBackend, ImageBackend};
pub use generation::{GenerationClient, GenerationError, ImageGenerator, RetryPolicy};
pub use image_processor::ImageProcessor;
