//! dffkit scene import
//!
//! Rebuilds a decoded DFF model as a host scene:
//! - meshes with per-loop UVs and split normals
//! - renderer-neutral materials with texture lookup
//! - one node per named frame, parented through the frame list
//!
//! Output goes through the [`SceneSink`] trait. [`SceneCollector`] keeps the
//! scene in memory and [`GltfSink`] writes glTF 2.0.

pub mod config;
pub mod diagnostics;
pub mod gltf;
mod hierarchy;
pub mod importer;
pub mod material;
pub mod mesh;
pub mod sink;
pub mod textures;

pub use config::{EmptyMarker, ImportOptions, MarkerShape};
pub use diagnostics::{Diagnostic, FaceRejection, ImportReport};
pub use gltf::{GltfExportError, GltfExportOptions, GltfSink};
pub use importer::DffImporter;
pub use material::{MaterialResolver, ResolvedMaterial};
pub use mesh::{BuiltFace, BuiltMesh, MeshBuild, MeshBuilder};
pub use sink::{
    MaterialDesc, MaterialHandle, MeshHandle, NodeDesc, NodeHandle, Scene, SceneCollector, SceneNode, SceneSink,
    TextureRef,
};
pub use textures::{FsTextureLoader, TextureError, TextureInfo, TextureLoader};
