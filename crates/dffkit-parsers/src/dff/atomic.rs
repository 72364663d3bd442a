// dffkit-parsers/src/dff/atomic.rs
//! Atomic decoding

use serde::{Deserialize, Serialize};

use super::chunks::ChunkType;
use super::geometry::{read_geometry, Geometry};
use super::reader::ChunkReader;
use super::skip_child;
use crate::traits::{ParseOptions, ParseResult};

/// Binds one geometry to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atomic {
    /// Index into the frame list
    pub frame: i32,
    /// Index into the geometry list
    pub geometry: i32,
    /// Render flags
    pub flags: u32,
}

impl Atomic {
    pub fn new(frame: i32, geometry: i32) -> Self {
        Self {
            frame,
            geometry,
            flags: 0,
        }
    }

    /// Frame index if non-negative
    pub fn frame_index(&self) -> Option<usize> {
        usize::try_from(self.frame).ok()
    }

    /// Geometry index if non-negative
    pub fn geometry_index(&self) -> Option<usize> {
        usize::try_from(self.geometry).ok()
    }
}

/// Decode the payload of an Atomic chunk, returning the inline geometry
/// too when the atomic carries one
pub fn read_atomic(mut atomic: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<(Atomic, Option<Geometry>)> {
    let (_, mut data) = atomic.enter_expected(ChunkType::Struct)?;
    data.require(8)?;
    let frame = data.read_i32()?;
    let geometry = data.read_i32()?;
    let flags = if data.remaining() >= 8 {
        let flags = data.read_u32()?;
        let _unused = data.read_u32()?;
        flags
    } else {
        0
    };
    data.finish();

    let mut inline = None;
    while let Some(child) = atomic.read_header()? {
        match child.chunk_type {
            ChunkType::Geometry if inline.is_none() => {
                let reader = atomic.enter(&child)?;
                inline = Some(read_geometry(reader, options)?);
            }
            _ => skip_child(&mut atomic, &child, options)?,
        }
    }

    tracing::debug!(frame, geometry, inline = inline.is_some(), "Decoded atomic");
    Ok((Atomic { frame, geometry, flags }, inline))
}
