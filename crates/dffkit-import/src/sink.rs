//! Host-facing scene interface
//!
//! The importer never touches a host scene graph directly. It hands
//! finished materials, meshes and nodes to a [`SceneSink`], which owns them
//! from then on.

use std::path::PathBuf;

use dffkit_core::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::EmptyMarker;
use crate::mesh::BuiltMesh;

/// Handle to a material owned by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHandle(pub usize);

/// Handle to a mesh owned by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub usize);

/// Handle to a node owned by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub usize);

/// Image bound to a material's base colour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    /// Texture name as stored in the model
    pub name: String,
    /// Resolved image path
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Renderer-neutral material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Unique within one import
    pub name: String,
    /// RGB scaled to `0.0..=1.0`, alpha dropped
    pub base_color: [f32; 3],
    /// Image found for the material's texture, if any
    pub texture: Option<TextureRef>,
    /// `None` leaves the renderer default
    pub specular: Option<f32>,
    /// `None` leaves the renderer default
    pub roughness: Option<f32>,
}

/// A node ready to be added to the host scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    pub name: String,
    pub mesh: Option<MeshHandle>,
    pub position: Vec3,
    /// Unit quaternion
    pub rotation: Quat,
}

/// Receiver of a rebuilt scene
///
/// Handles returned by the `add_*` methods are only meaningful to the sink
/// that produced them.
pub trait SceneSink {
    /// Register a material so meshes can reference it
    fn add_material(&mut self, material: MaterialDesc) -> MaterialHandle;

    /// Register a mesh. Its `material_slots` hold handles from
    /// [`SceneSink::add_material`] on this sink.
    fn add_mesh(&mut self, mesh: BuiltMesh) -> MeshHandle;

    /// Add a node at the scene root with its local transform
    fn add_node(&mut self, node: NodeDesc) -> NodeHandle;

    /// Attach `child` under `parent`; the child keeps its local transform.
    /// A node made its own parent is left where it is.
    fn set_parent(&mut self, child: NodeHandle, parent: NodeHandle);

    /// Draw `node` as a marker because it carries no mesh
    fn set_empty_marker(&mut self, node: NodeHandle, marker: EmptyMarker);
}

/// A node as stored by [`SceneCollector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub mesh: Option<MeshHandle>,
    pub position: Vec3,
    pub rotation: Quat,
    pub parent: Option<NodeHandle>,
    pub children: Vec<NodeHandle>,
    pub empty_marker: Option<EmptyMarker>,
}

/// In-memory scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub materials: Vec<MaterialDesc>,
    pub meshes: Vec<BuiltMesh>,
    /// Nodes in creation order
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(handle.0)
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&BuiltMesh> {
        self.meshes.get(handle.0)
    }

    /// First node with the given name
    pub fn find(&self, name: &str) -> Option<(NodeHandle, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(_, n)| n.name == name)
            .map(|(i, n)| (NodeHandle(i), n))
    }

    /// Nodes without a parent
    pub fn roots(&self) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| NodeHandle(i))
            .collect()
    }

    /// Mesh attached to the named node
    pub fn mesh_of(&self, name: &str) -> Option<&BuiltMesh> {
        self.find(name)
            .and_then(|(_, n)| n.mesh)
            .and_then(|m| self.mesh(m))
    }

    /// Indented node hierarchy, one node per line
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for root in self.roots() {
            self.write_node(&mut out, root, 0);
        }
        out
    }

    fn write_node(&self, out: &mut String, handle: NodeHandle, depth: usize) {
        let Some(node) = self.node(handle) else {
            return;
        };
        let detail = match node.mesh.and_then(|m| self.mesh(m)) {
            Some(mesh) => format!(" [{} verts, {} faces]", mesh.vertices.len(), mesh.faces.len()),
            None => String::new(),
        };
        out.push_str(&format!("{}{}{}\n", "  ".repeat(depth), node.name, detail));
        for &child in &node.children {
            self.write_node(out, child, depth + 1);
        }
    }
}

/// Sink that keeps everything in a [`Scene`]
#[derive(Debug, Default)]
pub struct SceneCollector {
    scene: Scene,
}

impl SceneCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn into_scene(self) -> Scene {
        self.scene
    }
}

impl SceneSink for SceneCollector {
    fn add_material(&mut self, material: MaterialDesc) -> MaterialHandle {
        self.scene.materials.push(material);
        MaterialHandle(self.scene.materials.len() - 1)
    }

    fn add_mesh(&mut self, mesh: BuiltMesh) -> MeshHandle {
        self.scene.meshes.push(mesh);
        MeshHandle(self.scene.meshes.len() - 1)
    }

    fn add_node(&mut self, node: NodeDesc) -> NodeHandle {
        self.scene.nodes.push(SceneNode {
            name: node.name,
            mesh: node.mesh,
            position: node.position,
            rotation: node.rotation,
            parent: None,
            children: Vec::new(),
            empty_marker: None,
        });
        NodeHandle(self.scene.nodes.len() - 1)
    }

    fn set_parent(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent || child.0 >= self.scene.nodes.len() || parent.0 >= self.scene.nodes.len() {
            return;
        }
        if let Some(old) = self.scene.nodes[child.0].parent.replace(parent) {
            self.scene.nodes[old.0].children.retain(|&c| c != child);
        }
        self.scene.nodes[parent.0].children.push(child);
    }

    fn set_empty_marker(&mut self, node: NodeHandle, marker: EmptyMarker) {
        if let Some(n) = self.scene.nodes.get_mut(node.0) {
            n.empty_marker = Some(marker);
        }
    }
}
