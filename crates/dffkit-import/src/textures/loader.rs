//! Image probing

use std::path::{Path, PathBuf};

use crate::textures::{TextureError, TextureResult};

/// An image that was found and could be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Resolves texture paths to images
pub trait TextureLoader: Send + Sync {
    /// Load the image at `path` or say why it cannot be used
    fn load(&self, path: &Path) -> TextureResult<TextureInfo>;
}

/// Loader backed by the local filesystem.
///
/// Only the image header is decoded; pixel data stays on disk for the host
/// to load.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTextureLoader;

impl FsTextureLoader {
    pub fn new() -> Self {
        Self
    }
}

impl TextureLoader for FsTextureLoader {
    fn load(&self, path: &Path) -> TextureResult<TextureInfo> {
        if !path.is_file() {
            return Err(TextureError::NotFound(path.to_path_buf()));
        }

        let (width, height) = image::image_dimensions(path)?;
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }

        tracing::trace!(path = %path.display(), width, height, "texture found");
        Ok(TextureInfo {
            path: path.to_path_buf(),
            width,
            height,
        })
    }
}
