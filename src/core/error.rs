//! Error types for the grass renderer

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A kernel, material or mesh reference required for activation is absent.
    #[error("Missing resource: {0}")]
    MissingResource(&'static str),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// An activation would not fit the device it runs on.
    #[error("{what} needs {requested}, device allows {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },
}
