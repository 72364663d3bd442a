//! dffkit-parsers
//!
//! Decoder for the RenderWare DFF model format used by the 3D-era GTA games.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | DFF    | `.dff`    | RenderWare Clump (frames, geometry, materials) |
//!
//! # Example
//!
//! ```rust,ignore
//! use dffkit_parsers::{DffParser, Parser};
//!
//! let parser = DffParser::new();
//! let model = parser.parse_file(Path::new("infernus.dff"))?;
//!
//! println!("Found {} frames", model.frames.len());
//! ```

pub mod traits;
pub mod logging;
pub mod dff;

// Re-export main types
pub use traits::{
    HierarchicalParser, HumanReadable, ParseError, ParseOptions, ParsePhase, ParseProgress,
    ParseResult, Parser, ProgressCallback,
};

pub use dff::{
    Atomic, ChunkHeader, ChunkReader, ChunkType, DffModel, DffParser, Frame, Geometry,
    GeometryFlags, Material, SurfaceProperties, Texture, Triangle,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
