// dffkit-parsers/src/dff/fixtures.rs
//! Synthetic DFF streams for tests and benchmarks.
//!
//! Writes raw chunk bytes from the decoder's own record types. Only the
//! fields the decoder reads are written; this is not a general exporter.

use dffkit_core::{Mat3, Vec3};

use super::atomic::Atomic;
use super::chunks::{decode_library_id, ChunkType, GTA_SA_LIBRARY_ID};
use super::frames::Frame;
use super::geometry::{Geometry, GeometryFlags, SurfaceProperties, GEOMETRY_SURFACE_PROPS_BEFORE};
use super::material::{Material, Texture, MATERIAL_SURFACE_PROPS_AFTER};

/// Wrap `payload` in a chunk header
pub fn chunk(chunk_type: ChunkType, library_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 12);
    out.extend_from_slice(&chunk_type.to_u32().to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&library_id.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Null-terminated String chunk padded to 4 bytes
pub fn string_chunk(text: &str, library_id: u32) -> Vec<u8> {
    let mut payload = text.as_bytes().to_vec();
    payload.push(0);
    while payload.len() % 4 != 0 {
        payload.push(0);
    }
    chunk(ChunkType::String, library_id, &payload)
}

fn put_vec3(out: &mut Vec<u8>, v: Vec3) {
    for c in v.to_array() {
        out.extend_from_slice(&c.to_le_bytes());
    }
}

fn put_surface(out: &mut Vec<u8>, props: Option<SurfaceProperties>) {
    let props = props.unwrap_or_default();
    for value in [props.ambient, props.specular, props.diffuse] {
        out.extend_from_slice(&value.unwrap_or(1.0).to_le_bytes());
    }
}

/// Frame List chunk, names written through the frame plugin
pub fn encode_frame_list(frames: &[Frame], library_id: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&(frames.len() as i32).to_le_bytes());
    for frame in frames {
        put_vec3(&mut data, frame.rotation.right);
        put_vec3(&mut data, frame.rotation.up);
        put_vec3(&mut data, frame.rotation.at);
        put_vec3(&mut data, frame.position);
        data.extend_from_slice(&frame.parent.to_le_bytes());
        data.extend_from_slice(&frame.flags.to_le_bytes());
    }

    let mut payload = chunk(ChunkType::Struct, library_id, &data);
    for frame in frames {
        let plugins = frame
            .name
            .as_ref()
            .map(|name| chunk(ChunkType::FrameName, library_id, name.as_bytes()))
            .unwrap_or_default();
        payload.extend(chunk(ChunkType::Extension, library_id, &plugins));
    }
    chunk(ChunkType::FrameList, library_id, &payload)
}

/// Texture chunk
pub fn encode_texture(texture: &Texture, library_id: u32) -> Vec<u8> {
    let mut data = vec![texture.filter, (texture.v_addressing << 4) | (texture.u_addressing & 0x0F)];
    data.extend_from_slice(&texture.mipmap_flags.to_le_bytes());

    let mut payload = chunk(ChunkType::Struct, library_id, &data);
    payload.extend(string_chunk(&texture.name, library_id));
    payload.extend(string_chunk(texture.mask.as_deref().unwrap_or(""), library_id));
    payload.extend(chunk(ChunkType::Extension, library_id, &[]));
    chunk(ChunkType::Texture, library_id, &payload)
}

/// Material chunk
pub fn encode_material(material: &Material, library_id: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&material.flags.to_le_bytes());
    let c = material.color;
    data.extend_from_slice(&[c.r, c.g, c.b, c.a]);
    data.extend_from_slice(&0i32.to_le_bytes());
    data.extend_from_slice(&u32::from(material.is_textured).to_le_bytes());
    if decode_library_id(library_id) > MATERIAL_SURFACE_PROPS_AFTER {
        put_surface(&mut data, material.surface_properties);
    }

    let mut payload = chunk(ChunkType::Struct, library_id, &data);
    for texture in &material.textures {
        payload.extend(encode_texture(texture, library_id));
    }
    payload.extend(chunk(ChunkType::Extension, library_id, &[]));
    chunk(ChunkType::Material, library_id, &payload)
}

/// Material List chunk with explicit slot indices; one Material chunk is
/// written per `-1` slot, taken from `materials` in order
pub fn encode_material_list(indices: &[i32], materials: &[Material], library_id: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&(indices.len() as i32).to_le_bytes());
    for index in indices {
        data.extend_from_slice(&index.to_le_bytes());
    }
    let mut payload = chunk(ChunkType::Struct, library_id, &data);
    for material in materials {
        payload.extend(encode_material(material, library_id));
    }
    chunk(ChunkType::MaterialList, library_id, &payload)
}

/// Format flags matching the arrays present in `geometry`
pub fn geometry_flags(geometry: &Geometry) -> GeometryFlags {
    let mut flags = geometry.flags.0 | GeometryFlags::POSITIONS;
    match geometry.uv_layers.len() {
        0 => {}
        1 => flags |= GeometryFlags::TEXTURED,
        2 => flags |= GeometryFlags::TEXTURED2,
        n => flags |= (n as u32 & 0xFF) << 16,
    }
    if geometry.normals.is_some() {
        flags |= GeometryFlags::NORMALS;
    }
    if geometry.prelit.is_some() {
        flags |= GeometryFlags::PRELIT;
    }
    GeometryFlags(flags)
}

/// Geometry struct payload only (single morph target)
pub fn encode_geometry_struct(geometry: &Geometry, library_id: u32) -> Vec<u8> {
    let flags = geometry_flags(geometry);
    let mut data = Vec::new();
    data.extend_from_slice(&flags.0.to_le_bytes());
    data.extend_from_slice(&(geometry.triangles.len() as i32).to_le_bytes());
    data.extend_from_slice(&(geometry.vertices.len() as i32).to_le_bytes());
    data.extend_from_slice(&1i32.to_le_bytes());
    if decode_library_id(library_id) < GEOMETRY_SURFACE_PROPS_BEFORE {
        put_surface(&mut data, geometry.surface_properties);
    }
    if let Some(prelit) = &geometry.prelit {
        for c in prelit {
            data.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
    }
    for layer in &geometry.uv_layers {
        for uv in layer {
            data.extend_from_slice(&uv.x.to_le_bytes());
            data.extend_from_slice(&uv.y.to_le_bytes());
        }
    }
    for t in &geometry.triangles {
        for index in [t.b, t.a, t.material, t.c] {
            data.extend_from_slice(&index.to_le_bytes());
        }
    }
    let sphere = geometry.bounding_sphere;
    put_vec3(&mut data, sphere.center);
    data.extend_from_slice(&sphere.radius.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&u32::from(geometry.normals.is_some()).to_le_bytes());
    for v in &geometry.vertices {
        put_vec3(&mut data, *v);
    }
    if let Some(normals) = &geometry.normals {
        for n in normals {
            put_vec3(&mut data, *n);
        }
    }
    data
}

/// Geometry chunk
pub fn encode_geometry(geometry: &Geometry, library_id: u32) -> Vec<u8> {
    let mut payload = chunk(ChunkType::Struct, library_id, &encode_geometry_struct(geometry, library_id));
    let indices = vec![-1; geometry.materials.len()];
    payload.extend(encode_material_list(&indices, &geometry.materials, library_id));
    payload.extend(chunk(ChunkType::Extension, library_id, &[]));
    chunk(ChunkType::Geometry, library_id, &payload)
}

/// Atomic chunk, optionally carrying its geometry inline
pub fn encode_atomic(atomic: &Atomic, inline: Option<&Geometry>, library_id: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&atomic.frame.to_le_bytes());
    data.extend_from_slice(&atomic.geometry.to_le_bytes());
    data.extend_from_slice(&atomic.flags.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());

    let mut payload = chunk(ChunkType::Struct, library_id, &data);
    if let Some(geometry) = inline {
        payload.extend(encode_geometry(geometry, library_id));
    }
    payload.extend(chunk(ChunkType::Extension, library_id, &[]));
    chunk(ChunkType::Atomic, library_id, &payload)
}

/// Builder for a complete single-clump stream
#[derive(Debug, Clone)]
pub struct DffBuilder {
    library_id: u32,
    frames: Vec<Frame>,
    geometries: Vec<Geometry>,
    atomics: Vec<(Atomic, Option<Geometry>)>,
    clump_extras: Vec<Vec<u8>>,
    leading: Vec<Vec<u8>>,
}

impl Default for DffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DffBuilder {
    /// Empty clump stamped as GTA San Andreas
    pub fn new() -> Self {
        Self {
            library_id: GTA_SA_LIBRARY_ID,
            frames: Vec::new(),
            geometries: Vec::new(),
            atomics: Vec::new(),
            clump_extras: Vec::new(),
            leading: Vec::new(),
        }
    }

    pub fn library_id(mut self, library_id: u32) -> Self {
        self.library_id = library_id;
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Identity-rotation frame at `position`
    pub fn named_frame(self, name: &str, parent: i32, position: Vec3) -> Self {
        self.frame(Frame {
            name: Some(name.to_string()),
            rotation: Mat3::IDENTITY,
            position,
            parent,
            flags: 0,
        })
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometries.push(geometry);
        self
    }

    pub fn atomic(mut self, frame: i32, geometry: i32) -> Self {
        self.atomics.push((Atomic::new(frame, geometry), None));
        self
    }

    /// Atomic whose geometry is stored inside the Atomic chunk
    pub fn atomic_with_inline_geometry(mut self, frame: i32, geometry: Geometry) -> Self {
        self.atomics.push((Atomic::new(frame, -1), Some(geometry)));
        self
    }

    /// Raw chunk appended to the clump after the atomics
    pub fn clump_chunk(mut self, raw: Vec<u8>) -> Self {
        self.clump_extras.push(raw);
        self
    }

    /// Raw top-level chunk written before the clump
    pub fn leading_chunk(mut self, raw: Vec<u8>) -> Self {
        self.leading.push(raw);
        self
    }

    /// Encode the stream
    pub fn build(&self) -> Vec<u8> {
        let lib = self.library_id;

        let mut data = Vec::new();
        data.extend_from_slice(&(self.atomics.len() as i32).to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        let mut payload = chunk(ChunkType::Struct, lib, &data);

        payload.extend(encode_frame_list(&self.frames, lib));

        let mut list = chunk(
            ChunkType::Struct,
            lib,
            &(self.geometries.len() as u32).to_le_bytes(),
        );
        for geometry in &self.geometries {
            list.extend(encode_geometry(geometry, lib));
        }
        payload.extend(chunk(ChunkType::GeometryList, lib, &list));

        for (atomic, inline) in &self.atomics {
            payload.extend(encode_atomic(atomic, inline.as_ref(), lib));
        }
        for extra in &self.clump_extras {
            payload.extend_from_slice(extra);
        }
        payload.extend(chunk(ChunkType::Extension, lib, &[]));

        let mut out: Vec<u8> = self.leading.concat();
        out.extend(chunk(ChunkType::Clump, lib, &payload));
        out
    }
}

/// Geometry with `vertices` and `triangles` and nothing else
pub fn simple_geometry(vertices: Vec<Vec3>, triangles: Vec<super::Triangle>) -> Geometry {
    Geometry {
        vertices,
        triangles,
        morph_target_count: 1,
        ..Geometry::default()
    }
}
