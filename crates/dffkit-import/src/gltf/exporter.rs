//! glTF scene sink

use super::*;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde_json::json;

use crate::config::EmptyMarker;
use crate::mesh::BuiltMesh;
use crate::sink::{MaterialDesc, MaterialHandle, MeshHandle, NodeDesc, NodeHandle, SceneSink};

/// Rotation taking the Z-up RenderWare frame to glTF's Y-up frame
const Z_UP_TO_Y_UP: [f32; 4] = [-std::f32::consts::FRAC_1_SQRT_2, 0.0, 0.0, std::f32::consts::FRAC_1_SQRT_2];

/// glTF export options
#[derive(Debug, Clone)]
pub struct GltfExportOptions {
    /// Export as GLB (single binary file) instead of separate JSON + BIN
    pub use_glb: bool,
    /// Pretty-print JSON
    pub pretty_json: bool,
    /// Wrap the scene in a root node rotating Z-up to Y-up
    pub z_up_to_y_up: bool,
    /// Include normals in export
    pub export_normals: bool,
    /// Include UVs in export
    pub export_uvs: bool,
}

impl Default for GltfExportOptions {
    fn default() -> Self {
        Self {
            use_glb: false,
            pretty_json: true,
            z_up_to_y_up: true,
            export_normals: true,
            export_uvs: true,
        }
    }
}

/// glTF export errors
#[derive(Debug, thiserror::Error)]
pub enum GltfExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid mesh data: {0}")]
    InvalidMeshData(String),
}

impl From<GltfExportError> for dffkit_core::Error {
    fn from(err: GltfExportError) -> Self {
        match err {
            GltfExportError::Io(e) => dffkit_core::Error::Io(e),
            other => dffkit_core::Error::export_failed(other.to_string()),
        }
    }
}

pub type GltfResult<T> = Result<T, GltfExportError>;

/// Scene sink that accumulates a glTF document.
///
/// Split normals and per-loop UVs have no welded form in glTF, so every
/// face corner becomes its own vertex. Faces are grouped into one
/// primitive per material slot.
#[derive(Debug)]
pub struct GltfSink {
    options: GltfExportOptions,
    binary_data: Vec<u8>,
    accessors: Vec<Accessor>,
    buffer_views: Vec<BufferView>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    /// Image name and file location; the URI depends on where the document lands
    images: Vec<(String, PathBuf)>,
    meshes: Vec<Mesh>,
    /// Sink mesh handle → glTF mesh, `None` for meshes without faces
    mesh_map: Vec<Option<usize>>,
    nodes: Vec<Node>,
    parents: Vec<Option<usize>>,
}

impl GltfSink {
    pub fn new(options: GltfExportOptions) -> Self {
        Self {
            options,
            binary_data: Vec::new(),
            accessors: Vec::new(),
            buffer_views: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            images: Vec::new(),
            meshes: Vec::new(),
            mesh_map: Vec::new(),
            nodes: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn options(&self) -> &GltfExportOptions {
        &self.options
    }

    /// Binary buffer contents so far
    pub fn binary_data(&self) -> &[u8] {
        &self.binary_data
    }

    /// Assemble the glTF document. `buffer_uri` is `None` for GLB output.
    ///
    /// Image URIs are made relative to `output_dir`, or to the working
    /// directory when it is `None`.
    pub fn document(&self, buffer_uri: Option<String>, output_dir: Option<&Path>) -> Gltf {
        let mut nodes = self.nodes.clone();
        for (child, parent) in self.parents.iter().enumerate() {
            if let Some(parent) = *parent {
                nodes[parent].children.push(child);
            }
        }

        let mut roots: Vec<usize> = (0..nodes.len()).filter(|&i| self.parents[i].is_none()).collect();
        if self.options.z_up_to_y_up {
            nodes.push(Node {
                name: Some("ZUpToYUp".to_string()),
                rotation: Some(Z_UP_TO_Y_UP),
                children: roots,
                ..Node::default()
            });
            roots = vec![nodes.len() - 1];
        }

        let buffers = if self.binary_data.is_empty() {
            Vec::new()
        } else {
            vec![Buffer {
                uri: buffer_uri,
                byte_length: self.binary_data.len(),
            }]
        };

        let output_dir = output_dir.unwrap_or_else(|| Path::new("."));
        let images = self
            .images
            .iter()
            .map(|(name, path)| Image {
                name: Some(name.clone()),
                uri: Some(image_uri(path, output_dir)),
            })
            .collect();

        Gltf {
            asset: Asset {
                version: "2.0".to_string(),
                generator: Some(format!("dffkit {}", env!("CARGO_PKG_VERSION"))),
            },
            scene: Some(0),
            scenes: vec![Scene {
                name: Some("Scene".to_string()),
                nodes: roots,
            }],
            nodes,
            meshes: self.meshes.clone(),
            materials: self.materials.clone(),
            textures: self.textures.clone(),
            images,
            accessors: self.accessors.clone(),
            buffer_views: self.buffer_views.clone(),
            buffers,
        }
    }

    /// Write the scene to `output_path`.
    ///
    /// The extension is replaced with `.glb`, or `.gltf` plus a `.bin`
    /// next to it. Returns the path of the main file.
    pub fn write(&self, output_path: impl AsRef<Path>) -> GltfResult<PathBuf> {
        let output_path = output_path.as_ref();
        if self.options.use_glb {
            self.write_glb(output_path)
        } else {
            self.write_separate_files(output_path)
        }
    }

    fn add_texture(&mut self, name: &str, path: &Path) -> usize {
        self.images.push((name.to_string(), path.to_path_buf()));
        self.textures.push(Texture {
            name: Some(name.to_string()),
            source: Some(self.images.len() - 1),
        });
        self.textures.len() - 1
    }

    fn add_positions(&mut self, positions: &[[f32; 3]]) -> usize {
        let offset = self.binary_data.len();
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];

        for position in positions {
            for i in 0..3 {
                self.binary_data.extend_from_slice(&position[i].to_le_bytes());
                min[i] = min[i].min(position[i]);
                max[i] = max[i].max(position[i]);
            }
        }

        self.add_accessor(offset, positions.len(), "VEC3", COMPONENT_TYPE_FLOAT, Some(min.to_vec()), Some(max.to_vec()), Some(TARGET_ARRAY_BUFFER))
    }

    fn add_floats<const N: usize>(&mut self, values: &[[f32; N]], accessor_type: &str) -> usize {
        let offset = self.binary_data.len();
        for value in values {
            for component in value {
                self.binary_data.extend_from_slice(&component.to_le_bytes());
            }
        }
        self.add_accessor(offset, values.len(), accessor_type, COMPONENT_TYPE_FLOAT, None, None, Some(TARGET_ARRAY_BUFFER))
    }

    fn add_indices(&mut self, indices: &[u32]) -> usize {
        let offset = self.binary_data.len();
        for index in indices {
            self.binary_data.extend_from_slice(&index.to_le_bytes());
        }
        self.add_accessor(offset, indices.len(), "SCALAR", COMPONENT_TYPE_UNSIGNED_INT, None, None, Some(TARGET_ELEMENT_ARRAY_BUFFER))
    }

    #[allow(clippy::too_many_arguments)]
    fn add_accessor(
        &mut self,
        offset: usize,
        count: usize,
        accessor_type: &str,
        component_type: u32,
        min: Option<Vec<f32>>,
        max: Option<Vec<f32>>,
        target: Option<u32>,
    ) -> usize {
        let byte_length = self.binary_data.len() - offset;

        let buffer_view_index = self.buffer_views.len();
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: Some(offset),
            byte_length,
            byte_stride: None,
            target,
        });

        self.accessors.push(Accessor {
            buffer_view: Some(buffer_view_index),
            byte_offset: None,
            component_type,
            count,
            accessor_type: accessor_type.to_string(),
            max,
            min,
        });
        self.accessors.len() - 1
    }

    /// Unweld `mesh` into per-loop attributes and emit one primitive per
    /// material slot.
    fn build_mesh(&mut self, mesh: &BuiltMesh) -> GltfResult<Mesh> {
        let loops = mesh.loop_count();
        let mut positions = Vec::with_capacity(loops);
        for face in &mesh.faces {
            for &v in &face.vertices {
                let p = mesh.vertices.get(v as usize).ok_or_else(|| {
                    GltfExportError::InvalidMeshData(format!("{}: vertex {v} out of range", mesh.name))
                })?;
                positions.push(p.to_array());
            }
        }

        let mut attributes = BTreeMap::new();
        attributes.insert("POSITION".to_string(), self.add_positions(&positions));

        if self.options.export_normals {
            if let Some(normals) = mesh.loop_normals.as_ref().filter(|n| n.len() == loops) {
                let normals: Vec<[f32; 3]> = normals.iter().map(|n| n.normalize().to_array()).collect();
                attributes.insert("NORMAL".to_string(), self.add_floats(&normals, "VEC3"));
            }
        }

        if self.options.export_uvs {
            for (layer_index, layer) in mesh.uv_layers.iter().enumerate() {
                if layer.len() != loops {
                    continue;
                }
                // glTF puts the UV origin top-left
                let uvs: Vec<[f32; 2]> = layer.iter().map(|uv| [uv.x, 1.0 - uv.y]).collect();
                attributes.insert(format!("TEXCOORD_{layer_index}"), self.add_floats(&uvs, "VEC2"));
            }
        }

        let mut groups: BTreeMap<Option<usize>, Vec<u32>> = BTreeMap::new();
        for (face_index, face) in mesh.faces.iter().enumerate() {
            let first = (face_index * 3) as u32;
            groups
                .entry(face.material)
                .or_default()
                .extend([first, first + 1, first + 2]);
        }

        let mut primitives = Vec::with_capacity(groups.len());
        for (slot, indices) in groups {
            let material = slot
                .and_then(|s| mesh.material_slots.get(s))
                .map(|handle| handle.0)
                .filter(|&m| m < self.materials.len());
            primitives.push(Primitive {
                attributes: attributes.clone(),
                indices: Some(self.add_indices(&indices)),
                material,
                mode: Some(MODE_TRIANGLES),
            });
        }

        Ok(Mesh {
            name: Some(mesh.name.clone()),
            primitives,
        })
    }

    /// Write separate JSON + BIN files
    fn write_separate_files(&self, output_path: &Path) -> GltfResult<PathBuf> {
        let json_path = output_path.with_extension("gltf");
        let bin_path = output_path.with_extension("bin");
        let bin_uri = bin_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let gltf = self.document(bin_uri, Some(output_dir(output_path)));
        let json = if self.options.pretty_json {
            serde_json::to_string_pretty(&gltf)?
        } else {
            serde_json::to_string(&gltf)?
        };
        std::fs::write(&json_path, json)?;

        if !self.binary_data.is_empty() {
            std::fs::write(&bin_path, &self.binary_data)?;
        }

        tracing::info!(path = %json_path.display(), bytes = self.binary_data.len(), "wrote glTF");
        Ok(json_path)
    }

    /// Write GLB (binary glTF)
    fn write_glb(&self, output_path: &Path) -> GltfResult<PathBuf> {
        let glb_path = output_path.with_extension("glb");
        let json = serde_json::to_string(&self.document(None, Some(output_dir(output_path))))?;

        let json_len = json.len();
        let json_padding = (4 - (json_len % 4)) % 4;
        let bin_len = self.binary_data.len();
        let bin_padding = (4 - (bin_len % 4)) % 4;
        let bin_chunk = if bin_len > 0 { 8 + bin_len + bin_padding } else { 0 };
        let total_len = 12 + 8 + json_len + json_padding + bin_chunk;

        let mut file = std::io::BufWriter::new(std::fs::File::create(&glb_path)?);

        file.write_all(GLB_MAGIC)?;
        file.write_all(&2u32.to_le_bytes())?;
        file.write_all(&(total_len as u32).to_le_bytes())?;

        file.write_all(&((json_len + json_padding) as u32).to_le_bytes())?;
        file.write_all(&GLB_CHUNK_JSON.to_le_bytes())?;
        file.write_all(json.as_bytes())?;
        file.write_all(&vec![b' '; json_padding])?;

        if bin_len > 0 {
            file.write_all(&((bin_len + bin_padding) as u32).to_le_bytes())?;
            file.write_all(&GLB_CHUNK_BIN.to_le_bytes())?;
            file.write_all(&self.binary_data)?;
            file.write_all(&vec![0u8; bin_padding])?;
        }
        file.flush()?;

        tracing::info!(path = %glb_path.display(), bytes = total_len, "wrote GLB");
        Ok(glb_path)
    }
}

/// Directory a file written to `output_path` ends up in
fn output_dir(output_path: &Path) -> &Path {
    output_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// URI of the image at `path` as seen from a document in `base_dir`.
///
/// Falls back to the bare file name when the two share no root.
fn image_uri(path: &Path, base_dir: &Path) -> String {
    let relative = relative_path(path, base_dir)
        .or_else(|| path.file_name().map(PathBuf::from))
        .unwrap_or_default();
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    percent_encode(&joined)
}

fn relative_path(path: &Path, base: &Path) -> Option<PathBuf> {
    let path = std::path::absolute(path).ok()?;
    let base = std::path::absolute(base).ok()?;
    let path_parts: Vec<Component<'_>> = path.components().filter(|c| *c != Component::CurDir).collect();
    let base_parts: Vec<Component<'_>> = base.components().filter(|c| *c != Component::CurDir).collect();

    let shared = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if shared == 0 {
        return None;
    }

    let mut relative = PathBuf::new();
    for _ in shared..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[shared..] {
        relative.push(part.as_os_str());
    }
    Some(relative)
}

/// Escape everything outside the URI unreserved set, keeping `/`
fn percent_encode(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/') {
            output.push(char::from(byte));
        } else {
            let _ = write!(output, "%{byte:02X}");
        }
    }
    output
}

impl Default for GltfSink {
    fn default() -> Self {
        Self::new(GltfExportOptions::default())
    }
}

impl SceneSink for GltfSink {
    fn add_material(&mut self, material: MaterialDesc) -> MaterialHandle {
        let texture = material
            .texture
            .as_ref()
            .map(|t| self.add_texture(&t.name, &t.path));
        let [r, g, b] = material.base_color;

        self.materials.push(Material {
            name: Some(material.name),
            pbr_metallic_roughness: Some(PbrMetallicRoughness {
                base_color_factor: Some([r, g, b, 1.0]),
                base_color_texture: texture.map(|index| TextureInfo { index, tex_coord: None }),
                metallic_factor: Some(0.0),
                roughness_factor: material.roughness.map(|r| r.clamp(0.0, 1.0)),
            }),
            extras: material.specular.map(|s| json!({ "specular": s })),
        });
        MaterialHandle(self.materials.len() - 1)
    }

    fn add_mesh(&mut self, mesh: BuiltMesh) -> MeshHandle {
        let index = if mesh.faces.is_empty() {
            tracing::debug!(mesh = %mesh.name, "mesh has no faces, not exported");
            None
        } else {
            match self.build_mesh(&mesh) {
                Ok(built) => {
                    self.meshes.push(built);
                    Some(self.meshes.len() - 1)
                }
                Err(err) => {
                    tracing::warn!(mesh = %mesh.name, "{err}");
                    None
                }
            }
        };
        self.mesh_map.push(index);
        MeshHandle(self.mesh_map.len() - 1)
    }

    fn add_node(&mut self, node: NodeDesc) -> NodeHandle {
        let mesh = node.mesh.and_then(|m| self.mesh_map.get(m.0).copied().flatten());
        self.nodes.push(Node {
            name: Some(node.name),
            mesh,
            translation: Some(node.position.to_array()),
            rotation: Some(node.rotation.to_array()),
            ..Node::default()
        });
        self.parents.push(None);
        NodeHandle(self.nodes.len() - 1)
    }

    fn set_parent(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child != parent && parent.0 < self.nodes.len() {
            if let Some(slot) = self.parents.get_mut(child.0) {
                *slot = Some(parent.0);
            }
        }
    }

    fn set_empty_marker(&mut self, node: NodeHandle, marker: EmptyMarker) {
        if let Some(node) = self.nodes.get_mut(node.0) {
            node.extras = Some(json!({ "empty_marker": marker }));
        }
    }
}
