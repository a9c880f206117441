// src/lib.rs
pub mod app;
pub mod config;
pub mod errors;
pub mod models;
pub mod platform;
pub mod repl;
pub mod services;
pub mod session;
pub mod view;

pub use app::{App, Platform};
pub use config::Config;
pub use errors::ImagineError;
pub use models::{AspectRatio, GeneratedImage, ImagePayload};
pub use session::{Event, Phase, SessionState, reduce};
