// dffkit-parsers/src/dff/reader.rs
//! Bounded little-endian cursor over chunk payloads.
//!
//! A [`ChunkReader`] only ever sees the bytes of one chunk. Entering a child
//! chunk hands out a reader over exactly `header.size` bytes and moves the
//! parent past them, so a decoder that stops early cannot desynchronize the
//! parent from the next sibling.

use byteorder::{ByteOrder, LittleEndian};
use dffkit_core::{Color, Vec2, Vec3};

use super::chunks::{ChunkHeader, ChunkType, CHUNK_HEADER_SIZE};
use crate::traits::{ParseError, ParseResult};

/// Cursor over the payload of a single chunk
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute stream offset of `data[0]`
    base: u64,
    /// Chunk whose payload this is; `None` for the top-level stream
    chunk: Option<ChunkType>,
    /// Chunk that contains `chunk`
    owner: Option<ChunkType>,
}

impl<'a> ChunkReader<'a> {
    /// Reader over a whole stream
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
            chunk: None,
            owner: None,
        }
    }

    /// Chunk type this reader is bounded to
    pub fn chunk(&self) -> Option<ChunkType> {
        self.chunk
    }

    /// Name of the enclosing chunk, for error messages.
    ///
    /// Struct payloads are named after their owner, e.g. `Atomic struct`.
    pub fn chunk_name(&self) -> String {
        match (self.chunk, self.owner) {
            (Some(ChunkType::Struct), Some(owner)) => format!("{owner} struct"),
            (Some(chunk), _) => chunk.name(),
            (None, _) => "stream".to_string(),
        }
    }

    /// Absolute stream offset of the next byte
    pub fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Bytes left in this chunk
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, requested: usize) -> ParseError {
        ParseError::Truncated {
            chunk: self.chunk_name(),
            offset: self.position(),
            requested,
            available: self.remaining(),
        }
    }

    /// Build a `Malformed` error located at the current position
    pub fn malformed(&self, message: impl Into<String>) -> ParseError {
        ParseError::Malformed {
            chunk: self.chunk_name(),
            offset: self.position(),
            message: message.into(),
        }
    }

    /// Fail with `Malformed` unless at least `min` bytes are left.
    ///
    /// Used by record decoders to check a fixed layout up front, so that a
    /// short struct is reported as malformed rather than truncated.
    pub fn require(&self, min: usize) -> ParseResult<()> {
        if self.remaining() < min {
            return Err(self.malformed(format!(
                "payload is {} bytes, layout needs {}",
                self.remaining(),
                min
            )));
        }
        Ok(())
    }

    /// Take the next `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.truncated(n));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> ParseResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a little-endian `u16`
    pub fn read_u16(&mut self) -> ParseResult<u16> {
        self.read_bytes(2).map(LittleEndian::read_u16)
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&mut self) -> ParseResult<u32> {
        self.read_bytes(4).map(LittleEndian::read_u32)
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&mut self) -> ParseResult<i32> {
        self.read_bytes(4).map(LittleEndian::read_i32)
    }

    /// Read a little-endian IEEE-754 single
    pub fn read_f32(&mut self) -> ParseResult<f32> {
        self.read_bytes(4).map(LittleEndian::read_f32)
    }

    /// RenderWare 32-bit boolean
    pub fn read_bool32(&mut self) -> ParseResult<bool> {
        Ok(self.read_u32()? != 0)
    }

    /// Two consecutive `f32`s, `x` first
    pub fn read_vec2(&mut self) -> ParseResult<Vec2> {
        let bytes = self.read_bytes(8)?;
        Ok(Vec2::new(
            LittleEndian::read_f32(&bytes[0..4]),
            LittleEndian::read_f32(&bytes[4..8]),
        ))
    }

    /// Three consecutive `f32`s in `x, y, z` order.
    ///
    /// Either all twelve bytes are consumed or none are.
    pub fn read_vec3(&mut self) -> ParseResult<Vec3> {
        let bytes = self.read_bytes(12)?;
        Ok(Vec3::new(
            LittleEndian::read_f32(&bytes[0..4]),
            LittleEndian::read_f32(&bytes[4..8]),
            LittleEndian::read_f32(&bytes[8..12]),
        ))
    }

    /// RGBA, one byte per channel
    pub fn read_color(&mut self) -> ParseResult<Color> {
        let b = self.read_bytes(4)?;
        Ok(Color::new(b[0], b[1], b[2], b[3]))
    }

    /// Read a fixed-width, null-padded string and trim it at the first null.
    ///
    /// With `require_nul` a field that has no terminator inside `width` bytes
    /// is rejected with `InvalidString`.
    pub fn read_string(&mut self, width: usize, require_nul: bool) -> ParseResult<String> {
        let offset = self.position();
        let bytes = self.read_bytes(width)?;
        let end = match bytes.iter().position(|&b| b == 0) {
            Some(end) => end,
            None if require_nul => {
                return Err(ParseError::InvalidString {
                    chunk: self.chunk_name(),
                    offset,
                });
            }
            None => bytes.len(),
        };
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read the next chunk header, or `None` at the end of this chunk
    pub fn read_header(&mut self) -> ParseResult<Option<ChunkHeader>> {
        if self.is_empty() {
            return Ok(None);
        }
        let offset = self.position();
        let bytes = self.read_bytes(CHUNK_HEADER_SIZE)?;
        Ok(Some(ChunkHeader {
            chunk_type: ChunkType::from_u32(LittleEndian::read_u32(&bytes[0..4])),
            size: LittleEndian::read_u32(&bytes[4..8]),
            library_id: LittleEndian::read_u32(&bytes[8..12]),
            offset,
        }))
    }

    /// Read the next header and check it has the expected type
    pub fn expect_header(&mut self, expected: ChunkType) -> ParseResult<ChunkHeader> {
        match self.read_header()? {
            Some(header) if header.chunk_type == expected => Ok(header),
            Some(header) => Err(ParseError::Malformed {
                chunk: self.chunk_name(),
                offset: header.offset,
                message: format!("expected {} chunk, found {}", expected, header.chunk_type),
            }),
            None => Err(ParseError::MissingChunk {
                chunk: expected.name(),
                context: self.chunk_name(),
            }),
        }
    }

    /// Bounded reader over the payload of `header`.
    ///
    /// The parent moves past the whole payload immediately, whatever the
    /// child ends up reading.
    pub fn enter(&mut self, header: &ChunkHeader) -> ParseResult<ChunkReader<'a>> {
        let size = header.size as usize;
        if size > self.remaining() {
            return Err(ParseError::Truncated {
                chunk: header.chunk_type.name(),
                offset: self.position(),
                requested: size,
                available: self.remaining(),
            });
        }
        let base = self.position();
        let data = &self.data[self.pos..self.pos + size];
        self.pos += size;
        Ok(ChunkReader {
            data,
            pos: 0,
            base,
            chunk: Some(header.chunk_type),
            owner: self.chunk,
        })
    }

    /// Read the header of the next child and enter it
    pub fn enter_expected(&mut self, expected: ChunkType) -> ParseResult<(ChunkHeader, ChunkReader<'a>)> {
        let header = self.expect_header(expected)?;
        let reader = self.enter(&header)?;
        Ok((header, reader))
    }

    /// Skip `n` bytes
    pub fn skip(&mut self, n: usize) -> ParseResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Skip over the payload of a child chunk whose header was just read
    pub fn skip_chunk(&mut self, header: &ChunkHeader) -> ParseResult<()> {
        tracing::trace!(
            chunk = %header.chunk_type,
            offset = header.offset,
            size = header.size,
            "Skipping chunk"
        );
        self.enter(header).map(|_| ())
    }

    /// Consume whatever is left of this chunk, tracing it if non-empty
    pub fn finish(mut self) {
        let left = self.remaining();
        if left > 0 {
            tracing::trace!(
                chunk = %self.chunk_name(),
                offset = self.position(),
                bytes = left,
                "Skipping trailing bytes"
            );
            self.pos = self.data.len();
        }
    }
}
