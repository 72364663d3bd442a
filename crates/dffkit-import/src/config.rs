//! Import configuration

use dffkit_core::{Error, Result};
use dffkit_parsers::ParseOptions;
use serde::{Deserialize, Serialize};

/// Display shape for frames that carry no mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    #[default]
    Cube,
    PlainAxes,
    Sphere,
}

/// How an empty (transform-only) node is drawn by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmptyMarker {
    pub shape: MarkerShape,
    pub size: f32,
}

impl Default for EmptyMarker {
    fn default() -> Self {
        Self {
            shape: MarkerShape::Cube,
            size: 0.05,
        }
    }
}

/// Options for building a scene from a decoded model
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Extension appended to texture names when looking for image files
    pub texture_extension: String,
    /// Attach per-corner normals when the geometry has them
    pub import_normals: bool,
    /// Marker applied to frames without a mesh
    pub empty_marker: EmptyMarker,
    /// Options for decoding the file
    pub parse: ParseOptions,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            texture_extension: "png".to_string(),
            import_normals: true,
            empty_marker: EmptyMarker::default(),
            parse: ParseOptions::default(),
        }
    }
}

impl ImportOptions {
    /// Reject option values that would make every lookup or marker invalid
    pub fn validate(&self) -> Result<()> {
        let ext = &self.texture_extension;
        if ext.is_empty() || ext.starts_with('.') {
            return Err(Error::invalid_config(format!(
                "texture extension {ext:?} must be non-empty and given without a leading dot"
            )));
        }
        let size = self.empty_marker.size;
        if !(size.is_finite() && size > 0.0) {
            return Err(Error::invalid_config(format!(
                "empty marker size must be positive, got {size}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ImportOptions::default();
        assert_eq!(options.texture_extension, "png");
        assert!(options.import_normals);
        assert_eq!(options.empty_marker.shape, MarkerShape::Cube);
        assert_eq!(options.empty_marker.size, 0.05);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ImportOptions::default().validate().is_ok());

        let dotted = ImportOptions {
            texture_extension: ".png".to_string(),
            ..ImportOptions::default()
        };
        let err = dotted.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));

        let empty = ImportOptions {
            texture_extension: String::new(),
            ..ImportOptions::default()
        };
        assert!(empty.validate().is_err());

        let flat = ImportOptions {
            empty_marker: EmptyMarker {
                shape: MarkerShape::Sphere,
                size: 0.0,
            },
            ..ImportOptions::default()
        };
        assert!(matches!(flat.validate(), Err(Error::InvalidConfig { .. })));
    }
}
