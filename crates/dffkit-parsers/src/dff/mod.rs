// dffkit-parsers/src/dff/mod.rs
//! DFF (RenderWare Clump) Parser
//!
//! DFF files are the model format of the RenderWare-era GTA games. A file is
//! a tree of chunks, each with a 12-byte header, rooted at a Clump.
//!
//! # Format Structure
//! ```text
//! Clump
//! ├── Struct            atomic / light / camera counts
//! ├── Frame List
//! │   ├── Struct        count, then rotation, position, parent per frame
//! │   └── Extension ×N  frame name plugin
//! ├── Geometry List
//! │   ├── Struct        count
//! │   └── Geometry ×N
//! │       ├── Struct    flags, prelit, UVs, triangles, morph targets
//! │       ├── Material List
//! │       │   ├── Struct
//! │       │   └── Material ×M ── Texture ── String, String
//! │       └── Extension
//! ├── Atomic ×K         frame index, geometry index
//! └── Extension
//! ```

pub mod atomic;
pub mod chunks;
pub mod frames;
pub mod geometry;
pub mod material;
pub mod reader;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

#[cfg(test)]
mod tests;

pub use atomic::Atomic;
pub use chunks::{ChunkHeader, ChunkType, CHUNK_HEADER_SIZE, GTA_III_LIBRARY_ID, GTA_SA_LIBRARY_ID};
pub use frames::Frame;
pub use geometry::{Geometry, GeometryFlags, SurfaceProperties, Triangle};
pub use material::{Material, Texture};
pub use reader::ChunkReader;

use std::io::{Read, Seek};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::traits::{
    HierarchicalParser, HumanReadable, ParseError, ParseOptions, ParsePhase, ParseProgress,
    ParseResult, Parser, ProgressCallback,
};

/// Decoded clump: the frame, geometry and atomic lists of one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DffModel {
    /// Decoded RenderWare version of the clump
    pub version: u32,
    /// Raw library id stamp of the clump
    pub library_id: u32,
    /// Frames in file order
    pub frames: Vec<Frame>,
    /// Geometries in file order, inline atomic geometry appended
    pub geometries: Vec<Geometry>,
    /// Atomics in file order
    pub atomics: Vec<Atomic>,
    /// Lights declared by the clump struct
    pub num_lights: u32,
    /// Cameras declared by the clump struct
    pub num_cameras: u32,
}

impl DffModel {
    /// Total vertex count across all geometries
    pub fn vertex_count(&self) -> usize {
        self.geometries.iter().map(Geometry::vertex_count).sum()
    }

    /// Total triangle count across all geometries
    pub fn triangle_count(&self) -> usize {
        self.geometries.iter().map(Geometry::triangle_count).sum()
    }

    /// Sorted, deduplicated names of all referenced textures
    pub fn texture_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .geometries
            .iter()
            .flat_map(|g| &g.materials)
            .flat_map(|m| &m.textures)
            .map(|t| t.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Indices of the frames whose parent is `index`
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.parent_index() == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of frames with no parent
    pub fn root_frames(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_root())
            .map(|(i, _)| i)
            .collect()
    }

    /// Cross-reference problems: atomics pointing outside the frame or
    /// geometry lists, and parents that are not defined earlier.
    pub fn reference_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (i, atomic) in self.atomics.iter().enumerate() {
            if atomic.frame_index().map_or(true, |f| f >= self.frames.len()) {
                problems.push(format!(
                    "atomic {i} references frame {} of {}",
                    atomic.frame,
                    self.frames.len()
                ));
            }
            if atomic.geometry_index().map_or(true, |g| g >= self.geometries.len()) {
                problems.push(format!(
                    "atomic {i} references geometry {} of {}",
                    atomic.geometry,
                    self.geometries.len()
                ));
            }
        }
        for (i, frame) in self.frames.iter().enumerate() {
            if !frame.is_root() && frame.parent_index().map_or(true, |p| p >= i) {
                problems.push(format!("frame {i} has parent {} not defined before it", frame.parent));
            }
        }
        problems
    }

    /// Indented frame hierarchy, one frame per line
    pub fn frame_tree(&self) -> String {
        let mut out = String::new();
        let mut visited = vec![false; self.frames.len()];
        for root in self.root_frames() {
            self.write_frame(&mut out, root, 0, &mut visited);
        }
        // frames reachable from no root (dangling or cyclic parents)
        for index in 0..self.frames.len() {
            if !visited[index] {
                self.write_frame(&mut out, index, 0, &mut visited);
            }
        }
        out
    }

    fn write_frame(&self, out: &mut String, index: usize, depth: usize, visited: &mut [bool]) {
        if visited[index] {
            return;
        }
        visited[index] = true;
        let frame = &self.frames[index];
        let meshes = self
            .atomics
            .iter()
            .filter(|a| a.frame_index() == Some(index))
            .count();
        out.push_str(&format!(
            "{}[{}] {}{}\n",
            "  ".repeat(depth),
            index,
            frame.display_name(),
            if meshes > 0 { " (mesh)" } else { "" }
        ));
        for child in self.children_of(index) {
            self.write_frame(out, child, depth + 1, visited);
        }
    }
}

/// Format a decoded RenderWare version as `3.6.0.3`
pub fn format_version(version: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (version >> 16) & 0xF,
        (version >> 12) & 0xF,
        (version >> 8) & 0xF,
        version & 0xFF
    )
}

impl HumanReadable for DffModel {
    fn to_readable_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("RenderWare {}\n", format_version(self.version)));
        out.push_str(&format!(
            "Frames: {}  Geometries: {}  Atomics: {}\n",
            self.frames.len(),
            self.geometries.len(),
            self.atomics.len()
        ));
        out.push_str(&format!(
            "Vertices: {}  Triangles: {}\n",
            self.vertex_count(),
            self.triangle_count()
        ));
        if self.num_lights > 0 || self.num_cameras > 0 {
            out.push_str(&format!("Lights: {}  Cameras: {}\n", self.num_lights, self.num_cameras));
        }
        let textures = self.texture_names();
        if !textures.is_empty() {
            out.push_str(&format!("Textures: {}\n", textures.join(", ")));
        }
        for problem in self.reference_problems() {
            out.push_str(&format!("Warning: {problem}\n"));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "version": format_version(self.version),
            "library_id": format!("0x{:08X}", self.library_id),
            "frames": self.frames.iter().map(|f| json!({
                "name": f.name,
                "parent": f.parent,
                "position": f.position.to_array(),
            })).collect::<Vec<_>>(),
            "geometries": self.geometries.iter().map(|g| json!({
                "vertices": g.vertex_count(),
                "triangles": g.triangle_count(),
                "uv_layers": g.uv_layers.len(),
                "normals": g.has_normals(),
                "prelit": g.prelit.is_some(),
                "materials": g.materials.iter().map(|m| json!({
                    "color": [m.color.r, m.color.g, m.color.b, m.color.a],
                    "texture": m.primary_texture().map(|t| t.name.clone()),
                })).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
            "atomics": self.atomics.iter().map(|a| json!({
                "frame": a.frame,
                "geometry": a.geometry,
            })).collect::<Vec<_>>(),
            "lights": self.num_lights,
            "cameras": self.num_cameras,
        })
    }
}

/// Skip a child chunk the caller has no decoder for.
///
/// Known-but-ignored types are always skipped; unknown types are an error
/// when `skip_unknown_chunks` is off.
pub(crate) fn skip_child(reader: &mut ChunkReader<'_>, header: &ChunkHeader, options: &ParseOptions) -> ParseResult<()> {
    if let ChunkType::Unknown(raw) = header.chunk_type {
        if !options.skip_unknown_chunks {
            return Err(ParseError::UnknownChunkType {
                chunk_type: raw,
                offset: header.offset,
            });
        }
    }
    reader.skip_chunk(header)
}

fn report(
    progress: Option<&ProgressCallback>,
    phase: ParsePhase,
    bytes_processed: u64,
    total_bytes: u64,
    current_item: Option<String>,
) {
    if let Some(cb) = progress {
        cb(ParseProgress {
            phase,
            bytes_processed,
            total_bytes: Some(total_bytes),
            current_item,
            items_processed: 0,
            total_items: None,
        });
    }
}

/// DFF Parser
#[derive(Debug, Clone, Copy)]
pub struct DffParser;

impl DffParser {
    /// Create a new DFF parser
    pub fn new() -> Self {
        Self
    }

    /// Decode a model held in memory
    pub fn parse_bytes(
        &self,
        data: &[u8],
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<DffModel> {
        crate::logging::instrument_parse(self.name(), || self.decode_stream(data, options, progress.as_ref()))
    }

    fn decode_stream(
        &self,
        data: &[u8],
        options: &ParseOptions,
        progress: Option<&ProgressCallback>,
    ) -> ParseResult<DffModel> {
        let total = data.len() as u64;
        report(progress, ParsePhase::ReadingHeader, 0, total, None);

        let mut stream = ChunkReader::new(data);
        let mut model = None;
        loop {
            if model.is_some() && stream.remaining() < CHUNK_HEADER_SIZE {
                if !stream.is_empty() {
                    tracing::trace!(bytes = stream.remaining(), "Ignoring padding after last chunk");
                }
                break;
            }
            let Some(header) = stream.read_header()? else {
                break;
            };
            match header.chunk_type {
                ChunkType::Clump if model.is_none() => {
                    report(progress, ParsePhase::ParsingRecords, header.offset, total, Some(header.chunk_type.name()));
                    let clump = stream.enter(&header)?;
                    model = Some(self.decode_clump(clump, &header, options, progress, total)?);
                }
                ChunkType::Clump => {
                    tracing::info!(offset = header.offset, "Skipping additional clump");
                    stream.skip_chunk(&header)?;
                }
                _ => skip_child(&mut stream, &header, options)?,
            }
        }

        let model = model.ok_or_else(|| ParseError::MissingChunk {
            chunk: ChunkType::Clump.name(),
            context: "stream".into(),
        })?;

        if options.strict_validation {
            report(progress, ParsePhase::LinkingReferences, total, total, None);
            for problem in model.reference_problems() {
                tracing::warn!(problem = %problem, "Broken reference");
            }
        }

        report(progress, ParsePhase::Complete, total, total, None);
        Ok(model)
    }

    fn decode_clump(
        &self,
        mut clump: ChunkReader<'_>,
        header: &ChunkHeader,
        options: &ParseOptions,
        progress: Option<&ProgressCallback>,
        total: u64,
    ) -> ParseResult<DffModel> {
        let (_, mut data) = clump.enter_expected(ChunkType::Struct)?;
        data.require(4)?;
        let num_atomics = data.read_i32()?;
        let (num_lights, num_cameras) = if data.remaining() >= 8 {
            (data.read_u32()?, data.read_u32()?)
        } else {
            (0, 0)
        };
        data.finish();

        let mut frame_list = None;
        let mut geometries = Vec::new();
        let mut atomics = Vec::new();

        while let Some(child) = clump.read_header()? {
            match child.chunk_type {
                ChunkType::FrameList => {
                    let list = clump.enter(&child)?;
                    frame_list = Some(frames::read_frame_list(list, options).map_err(|e| e.with_context("frame list"))?);
                }
                ChunkType::GeometryList => {
                    report(progress, ParsePhase::ParsingRecords, child.offset, total, Some(child.chunk_type.name()));
                    let list = clump.enter(&child)?;
                    geometries.extend(
                        geometry::read_geometry_list(list, options).map_err(|e| e.with_context("geometry list"))?,
                    );
                }
                ChunkType::Atomic => {
                    let index = atomics.len();
                    let reader = clump.enter(&child)?;
                    let (mut decoded, inline) = atomic::read_atomic(reader, options)
                        .map_err(|e| e.with_context(format!("atomic {index}")))?;
                    if let Some(inline) = inline {
                        decoded.geometry = i32::try_from(geometries.len()).unwrap_or(i32::MAX);
                        geometries.push(inline);
                    }
                    atomics.push(decoded);
                }
                _ => skip_child(&mut clump, &child, options)?,
            }
        }

        let frames = frame_list.ok_or_else(|| ParseError::MissingChunk {
            chunk: ChunkType::FrameList.name(),
            context: ChunkType::Clump.name(),
        })?;

        if usize::try_from(num_atomics).ok() != Some(atomics.len()) {
            tracing::debug!(declared = num_atomics, found = atomics.len(), "Atomic count mismatch");
        }

        let model = DffModel {
            version: header.version(),
            library_id: header.library_id,
            frames,
            geometries,
            atomics,
            num_lights,
            num_cameras,
        };
        tracing::info!(
            version = %format_version(model.version),
            frames = model.frames.len(),
            geometries = model.geometries.len(),
            atomics = model.atomics.len(),
            "Decoded clump"
        );
        Ok(model)
    }
}

impl Default for DffParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for DffParser {
    type Output = DffModel;

    fn extensions(&self) -> &[&str] {
        &["dff"]
    }

    fn name(&self) -> &str {
        "RenderWare DFF Parser"
    }

    fn parse_with_options<R: Read + Seek>(
        &self,
        mut reader: R,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.parse_bytes(&data, options, progress)
    }

    #[allow(unsafe_code)]
    fn parse_memory_mapped(
        &self,
        path: &Path,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and lives only for this call; the
        // file must not be truncated by another process while it is mapped.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        tracing::debug!(path = %path.display(), bytes = mmap.len(), "Memory-mapped model");
        self.parse_bytes(&mmap, options, progress)
    }
}

impl HierarchicalParser for DffParser {
    type Node = Frame;

    fn roots<'a>(&self, parsed: &'a Self::Output) -> Vec<&'a Self::Node> {
        parsed.root_frames().into_iter().map(|i| &parsed.frames[i]).collect()
    }

    fn children<'a>(&self, parsed: &'a Self::Output, node: &Self::Node) -> Vec<&'a Self::Node> {
        parsed
            .frames
            .iter()
            .position(|f| std::ptr::eq(f, node))
            .map(|index| parsed.children_of(index).into_iter().map(|i| &parsed.frames[i]).collect())
            .unwrap_or_default()
    }
}
