// dffkit-parsers/src/dff/geometry.rs
//! Geometry and Geometry List decoding

use dffkit_core::{BoundingSphere, Color, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::chunks::{ChunkHeader, ChunkType};
use super::material::{read_material_list, Material};
use super::reader::ChunkReader;
use super::skip_child;
use crate::traits::{ParseError, ParseOptions, ParseResult};

/// Files older than this embed surface properties in the geometry struct
pub const GEOMETRY_SURFACE_PROPS_BEFORE: u32 = 0x34000;

/// Geometry format flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GeometryFlags(pub u32);

impl GeometryFlags {
    pub const TRISTRIP: u32 = 0x0000_0001;
    pub const POSITIONS: u32 = 0x0000_0002;
    pub const TEXTURED: u32 = 0x0000_0004;
    pub const PRELIT: u32 = 0x0000_0008;
    pub const NORMALS: u32 = 0x0000_0010;
    pub const LIGHT: u32 = 0x0000_0020;
    pub const MODULATE_MATERIAL_COLOR: u32 = 0x0000_0040;
    pub const TEXTURED2: u32 = 0x0000_0080;
    pub const NATIVE: u32 = 0x0100_0000;

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn is_native(&self) -> bool {
        self.contains(Self::NATIVE)
    }

    /// Number of UV layers stored per vertex
    pub fn uv_layer_count(&self) -> usize {
        match (self.0 >> 16) & 0xFF {
            0 if self.contains(Self::TEXTURED2) => 2,
            0 if self.contains(Self::TEXTURED) => 1,
            n => n as usize,
        }
    }
}

/// Triangle as vertex indices plus a material index into the geometry's
/// material list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    /// First corner
    pub a: u16,
    /// Second corner
    pub b: u16,
    /// Third corner
    pub c: u16,
    /// Index into [`Geometry::materials`], not checked at decode time
    pub material: u16,
}

impl Triangle {
    pub fn new(a: u16, b: u16, c: u16, material: u16) -> Self {
        Self { a, b, c, material }
    }

    /// Corner indices in winding order
    pub fn indices(&self) -> [u16; 3] {
        [self.a, self.b, self.c]
    }
}

/// Lighting coefficients; each field may be absent so that a material can
/// override only part of its geometry's values
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceProperties {
    pub ambient: Option<f32>,
    pub specular: Option<f32>,
    pub diffuse: Option<f32>,
}

impl SurfaceProperties {
    /// All three coefficients present
    pub fn new(ambient: f32, specular: f32, diffuse: f32) -> Self {
        Self {
            ambient: Some(ambient),
            specular: Some(specular),
            diffuse: Some(diffuse),
        }
    }

    pub(crate) fn read(reader: &mut ChunkReader<'_>) -> ParseResult<Self> {
        reader.require(12)?;
        let ambient = reader.read_f32()?;
        let specular = reader.read_f32()?;
        let diffuse = reader.read_f32()?;
        Ok(Self::new(ambient, specular, diffuse))
    }
}

/// Decoded geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Format flags
    pub flags: GeometryFlags,
    /// Vertex positions of the first morph target
    pub vertices: Vec<Vec3>,
    /// Per-vertex normals, present when the first morph target has them
    pub normals: Option<Vec<Vec3>>,
    /// Triangle list
    pub triangles: Vec<Triangle>,
    /// One coordinate per vertex for each layer
    pub uv_layers: Vec<Vec<Vec2>>,
    /// Prelit vertex colours
    pub prelit: Option<Vec<Color>>,
    /// Material list
    pub materials: Vec<Material>,
    /// Surface properties embedded in old-format geometry
    pub surface_properties: Option<SurfaceProperties>,
    /// Bounding sphere of the first morph target
    pub bounding_sphere: BoundingSphere,
    /// Number of morph targets stored in the file
    pub morph_target_count: u32,
}

impl Geometry {
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_native(&self) -> bool {
        self.flags.is_native()
    }
}

fn layout(reader: &ChunkReader<'_>, count: usize, stride: usize, what: &str) -> ParseResult<usize> {
    count
        .checked_mul(stride)
        .ok_or_else(|| reader.malformed(format!("{what} count {count} overflows")))
}

fn read_count(reader: &mut ChunkReader<'_>, what: &str) -> ParseResult<usize> {
    let value = reader.read_i32()?;
    usize::try_from(value).map_err(|_| reader.malformed(format!("negative {what} count {value}")))
}

/// Decode the payload of a Geometry chunk
pub fn read_geometry(mut geometry: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<Geometry> {
    let (header, data) = geometry.enter_expected(ChunkType::Struct)?;
    let mut result = read_geometry_struct(data, &header)?;

    while let Some(child) = geometry.read_header()? {
        match child.chunk_type {
            ChunkType::MaterialList => {
                let list = geometry.enter(&child)?;
                result.materials = read_material_list(list, options)?;
            }
            _ => skip_child(&mut geometry, &child, options)?,
        }
    }

    tracing::debug!(
        vertices = result.vertices.len(),
        triangles = result.triangles.len(),
        uv_layers = result.uv_layers.len(),
        materials = result.materials.len(),
        normals = result.has_normals(),
        "Decoded geometry"
    );
    Ok(result)
}

fn read_geometry_struct(mut data: ChunkReader<'_>, header: &ChunkHeader) -> ParseResult<Geometry> {
    data.require(16)?;
    let flags = GeometryFlags(data.read_u32()?);
    let triangle_count = read_count(&mut data, "triangle")?;
    let vertex_count = read_count(&mut data, "vertex")?;
    let morph_target_count = read_count(&mut data, "morph target")?;

    let mut result = Geometry {
        flags,
        morph_target_count: morph_target_count as u32,
        ..Geometry::default()
    };

    if header.version() < GEOMETRY_SURFACE_PROPS_BEFORE {
        result.surface_properties = Some(SurfaceProperties::read(&mut data)?);
    }

    if flags.is_native() {
        tracing::warn!(offset = header.offset, "Native geometry has no decodable vertex data");
        data.finish();
        return Ok(result);
    }

    if flags.contains(GeometryFlags::PRELIT) {
        data.require(layout(&data, vertex_count, 4, "prelit colour")?)?;
        let mut colors = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            colors.push(data.read_color()?);
        }
        result.prelit = Some(colors);
    }

    let layer_count = flags.uv_layer_count();
    data.require(layout(&data, vertex_count, 8 * layer_count, "uv")?)?;
    for _ in 0..layer_count {
        let mut layer = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            layer.push(data.read_vec2()?);
        }
        result.uv_layers.push(layer);
    }

    data.require(layout(&data, triangle_count, 8, "triangle")?)?;
    result.triangles.reserve(triangle_count);
    for _ in 0..triangle_count {
        // stored as (b, a, material, c)
        let b = data.read_u16()?;
        let a = data.read_u16()?;
        let material = data.read_u16()?;
        let c = data.read_u16()?;
        result.triangles.push(Triangle::new(a, b, c, material));
    }

    let vector_bytes = layout(&data, vertex_count, 12, "vertex")?;
    for target in 0..morph_target_count {
        data.require(24)?;
        let center = data.read_vec3()?;
        let radius = data.read_f32()?;
        let has_vertices = data.read_bool32()?;
        let has_normals = data.read_bool32()?;

        if target > 0 {
            // later targets carry animation data only
            let skip = (usize::from(has_vertices) * vector_bytes)
                .saturating_add(usize::from(has_normals) * vector_bytes);
            data.require(skip)?;
            data.skip(skip)?;
            continue;
        }

        result.bounding_sphere = BoundingSphere { center, radius };
        if has_vertices {
            result.vertices = read_vectors(&mut data, vertex_count, vector_bytes)?;
        }
        if has_normals {
            result.normals = Some(read_vectors(&mut data, vertex_count, vector_bytes)?);
        }
    }

    if result.vertices.is_empty() && vertex_count > 0 {
        // keep per-vertex arrays consistent with the (empty) position array
        tracing::warn!(offset = header.offset, vertex_count, "Geometry has no vertex positions");
        result.uv_layers.clear();
        result.prelit = None;
        result.normals = None;
    }

    data.finish();
    Ok(result)
}

fn read_vectors(data: &mut ChunkReader<'_>, count: usize, bytes: usize) -> ParseResult<Vec<Vec3>> {
    data.require(bytes)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(data.read_vec3()?);
    }
    Ok(out)
}

/// Decode the payload of a Geometry List chunk
pub fn read_geometry_list(mut list: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<Vec<Geometry>> {
    let (struct_header, mut data) = list.enter_expected(ChunkType::Struct)?;
    data.require(4)?;
    let declared = data.read_u32()? as usize;
    data.finish();

    let mut geometries = Vec::with_capacity(declared.min(4096));
    while let Some(header) = list.read_header()? {
        match header.chunk_type {
            ChunkType::Geometry => {
                let index = geometries.len();
                let geometry = list.enter(&header)?;
                let decoded = read_geometry(geometry, options).map_err(|e| {
                    e.with_context(format!("geometry {index} at offset {:#x}", header.offset))
                })?;
                geometries.push(decoded);
            }
            _ => skip_child(&mut list, &header, options)?,
        }
    }

    if geometries.len() != declared {
        return Err(ParseError::Malformed {
            chunk: ChunkType::GeometryList.name(),
            offset: struct_header.offset,
            message: format!("declares {declared} geometries, found {}", geometries.len()),
        });
    }
    Ok(geometries)
}
