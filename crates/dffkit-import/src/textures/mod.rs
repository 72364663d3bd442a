//! Texture lookup for material resolution
//!
//! Textures are referenced by name only. The importer turns each name into
//! an image path next to the source model and asks a [`TextureLoader`]
//! whether that image is usable.

mod loader;

pub use loader::{FsTextureLoader, TextureInfo, TextureLoader};

use std::path::PathBuf;

use thiserror::Error;

/// Texture loading errors
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No image at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

pub type TextureResult<T> = Result<T, TextureError>;
