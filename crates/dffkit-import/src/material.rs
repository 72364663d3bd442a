//! Material → renderer-neutral description

use std::path::{Path, PathBuf};

use dffkit_parsers::{Material, SurfaceProperties};

use crate::diagnostics::Diagnostic;
use crate::sink::{MaterialDesc, TextureRef};
use crate::textures::TextureLoader;

/// Outcome of resolving one material
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMaterial {
    pub desc: MaterialDesc,
    /// Set when the texture could not be bound
    pub diagnostic: Option<Diagnostic>,
}

/// Resolves decoded materials against a texture directory
pub struct MaterialResolver<'a, L: TextureLoader + ?Sized> {
    loader: &'a L,
    texture_dir: &'a Path,
    extension: &'a str,
}

impl<'a, L: TextureLoader + ?Sized> MaterialResolver<'a, L> {
    pub fn new(loader: &'a L, texture_dir: &'a Path, extension: &'a str) -> Self {
        Self {
            loader,
            texture_dir,
            extension,
        }
    }

    /// Where the image for texture `name` is expected
    pub fn texture_path(&self, name: &str) -> PathBuf {
        self.texture_dir.join(format!("{name}.{}", self.extension))
    }

    /// Resolve `material`, falling back to the owning geometry's surface
    /// properties field by field.
    pub fn resolve(
        &self,
        material: &Material,
        geometry_surface: Option<&SurfaceProperties>,
        name: impl Into<String>,
    ) -> ResolvedMaterial {
        let own = material.surface_properties.as_ref();
        let specular = own
            .and_then(|p| p.specular)
            .or_else(|| geometry_surface.and_then(|p| p.specular));
        let roughness = own
            .and_then(|p| p.diffuse)
            .or_else(|| geometry_surface.and_then(|p| p.diffuse));

        let mut diagnostic = None;
        let texture = material.primary_texture().and_then(|texture| {
            let path = self.texture_path(&texture.name);
            match self.loader.load(&path) {
                Ok(info) => Some(TextureRef {
                    name: texture.name.clone(),
                    path: info.path,
                    width: info.width,
                    height: info.height,
                }),
                Err(err) => {
                    diagnostic = Some(Diagnostic::MissingTexture {
                        path,
                        reason: err.to_string(),
                    });
                    None
                }
            }
        });

        ResolvedMaterial {
            desc: MaterialDesc {
                name: name.into(),
                base_color: material.color.to_rgb_float(),
                texture,
                specular,
                roughness,
            },
            diagnostic,
        }
    }
}
