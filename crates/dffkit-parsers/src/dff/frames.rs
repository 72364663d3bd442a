// dffkit-parsers/src/dff/frames.rs
//! Frame List decoding

use dffkit_core::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::chunks::ChunkType;
use super::reader::ChunkReader;
use super::skip_child;
use crate::traits::{ParseOptions, ParseResult};

/// Bytes per frame record in the Frame List struct
pub const FRAME_RECORD_SIZE: usize = 56;

/// A node of the frame hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Name from the frame plugin, if the frame has one
    pub name: Option<String>,
    /// Basis rows: right, up, at
    pub rotation: Mat3,
    /// Local position
    pub position: Vec3,
    /// Index of the parent frame, or -1
    pub parent: i32,
    /// Raw matrix creation flags
    pub flags: u32,
}

impl Frame {
    /// Parent index, `None` for root frames
    pub fn parent_index(&self) -> Option<usize> {
        usize::try_from(self.parent).ok()
    }

    pub fn is_root(&self) -> bool {
        self.parent < 0
    }

    /// Name for display, `"<unnamed>"` if absent
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            name: None,
            rotation: Mat3::IDENTITY,
            position: Vec3::ZERO,
            parent: -1,
            flags: 0,
        }
    }
}

/// Decode the payload of a Frame List chunk
pub fn read_frame_list(mut list: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<Vec<Frame>> {
    let (_, mut data) = list.enter_expected(ChunkType::Struct)?;
    data.require(4)?;
    let count = data.read_i32()?;
    let count = usize::try_from(count)
        .map_err(|_| data.malformed(format!("negative frame count {count}")))?;
    let needed = count
        .checked_mul(FRAME_RECORD_SIZE)
        .ok_or_else(|| data.malformed(format!("frame count {count} overflows")))?;
    data.require(needed)?;

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let right = data.read_vec3()?;
        let up = data.read_vec3()?;
        let at = data.read_vec3()?;
        let position = data.read_vec3()?;
        let parent = data.read_i32()?;
        let flags = data.read_u32()?;
        frames.push(Frame {
            name: None,
            rotation: Mat3::new(right, up, at),
            position,
            parent,
            flags,
        });
    }
    data.finish();

    // One extension per frame, in frame order
    let mut next = 0usize;
    while let Some(header) = list.read_header()? {
        if header.chunk_type == ChunkType::Extension && next < frames.len() {
            let extension = list.enter(&header)?;
            frames[next].name = read_frame_extension(extension, options)?;
            next += 1;
        } else {
            skip_child(&mut list, &header, options)?;
        }
    }
    if next < frames.len() {
        tracing::debug!(frames = frames.len(), extensions = next, "Frame list has fewer extensions than frames");
    }

    tracing::debug!(count = frames.len(), "Decoded frame list");
    Ok(frames)
}

/// Pull the frame name out of a frame's extension; other plugins are skipped
fn read_frame_extension(mut extension: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<Option<String>> {
    let mut name = None;
    while let Some(header) = extension.read_header()? {
        match header.chunk_type {
            ChunkType::FrameName => {
                let mut plugin = extension.enter(&header)?;
                let text = plugin.read_string(header.size as usize, false)?;
                name = (!text.is_empty()).then_some(text);
            }
            _ => skip_child(&mut extension, &header, options)?,
        }
    }
    Ok(name)
}
