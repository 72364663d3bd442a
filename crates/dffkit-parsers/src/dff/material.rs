// dffkit-parsers/src/dff/material.rs
//! Material List, Material and Texture decoding

use dffkit_core::Color;
use serde::{Deserialize, Serialize};

use super::chunks::ChunkType;
use super::geometry::SurfaceProperties;
use super::reader::ChunkReader;
use super::skip_child;
use crate::traits::{ParseError, ParseOptions, ParseResult};

/// Materials newer than this carry surface properties in their struct
pub const MATERIAL_SURFACE_PROPS_AFTER: u32 = 0x30400;

/// Texture reference; the image itself lives outside the model file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Texture {
    /// Base name without extension
    pub name: String,
    /// Alpha mask name
    pub mask: Option<String>,
    /// Filter mode
    pub filter: u8,
    /// U addressing mode
    pub u_addressing: u8,
    /// V addressing mode
    pub v_addressing: u8,
    /// Mipmap flags
    pub mipmap_flags: u16,
}

/// Material of a geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unused by the engine, kept as read
    pub flags: u32,
    pub color: Color,
    pub is_textured: bool,
    pub textures: Vec<Texture>,
    /// Overrides of the owning geometry's surface properties
    pub surface_properties: Option<SurfaceProperties>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            flags: 0,
            color: Color::WHITE,
            is_textured: false,
            textures: Vec::new(),
            surface_properties: None,
        }
    }
}

impl Material {
    /// The texture used for rendering, if any
    pub fn primary_texture(&self) -> Option<&Texture> {
        if self.is_textured {
            self.textures.first()
        } else {
            None
        }
    }
}

/// Decode the payload of a Material List chunk.
///
/// The struct holds one index per slot: -1 takes the next Material chunk,
/// anything else repeats an earlier slot.
pub fn read_material_list(mut list: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<Vec<Material>> {
    let (struct_header, mut data) = list.enter_expected(ChunkType::Struct)?;
    data.require(4)?;
    let count = data.read_i32()?;
    let count = usize::try_from(count)
        .map_err(|_| data.malformed(format!("negative material count {count}")))?;
    let needed = count
        .checked_mul(4)
        .ok_or_else(|| data.malformed(format!("material count {count} overflows")))?;
    data.require(needed)?;
    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        indices.push(data.read_i32()?);
    }
    data.finish();

    let mut decoded = Vec::new();
    while let Some(header) = list.read_header()? {
        match header.chunk_type {
            ChunkType::Material => {
                let material = list.enter(&header)?;
                decoded.push(read_material(material, options)?);
            }
            _ => skip_child(&mut list, &header, options)?,
        }
    }

    let malformed = |message: String| ParseError::Malformed {
        chunk: ChunkType::MaterialList.name(),
        offset: struct_header.offset,
        message,
    };

    let mut fresh = decoded.into_iter();
    let mut materials: Vec<Material> = Vec::with_capacity(count);
    for (slot, index) in indices.into_iter().enumerate() {
        let material = if index < 0 {
            fresh
                .next()
                .ok_or_else(|| malformed(format!("slot {slot} needs a Material chunk, none left")))?
        } else {
            let earlier = index as usize;
            if earlier >= slot {
                return Err(malformed(format!("slot {slot} reuses slot {earlier}, which is not defined yet")));
            }
            materials[earlier].clone()
        };
        materials.push(material);
    }

    let unused = fresh.count();
    if unused > 0 {
        tracing::debug!(unused, "Material list has more Material chunks than slots");
    }
    Ok(materials)
}

/// Decode the payload of a Material chunk
pub fn read_material(mut material: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<Material> {
    let (header, mut data) = material.enter_expected(ChunkType::Struct)?;
    data.require(16)?;
    let flags = data.read_u32()?;
    let color = data.read_color()?;
    let _unused = data.read_i32()?;
    let is_textured = data.read_bool32()?;
    let surface_properties = if header.version() > MATERIAL_SURFACE_PROPS_AFTER {
        Some(SurfaceProperties::read(&mut data)?)
    } else {
        None
    };
    data.finish();

    let mut textures = Vec::new();
    while let Some(child) = material.read_header()? {
        match child.chunk_type {
            ChunkType::Texture => {
                let texture = material.enter(&child)?;
                textures.push(read_texture(texture, options)?);
            }
            _ => skip_child(&mut material, &child, options)?,
        }
    }

    if is_textured && textures.is_empty() {
        tracing::debug!(offset = header.offset, "Textured material has no Texture chunk");
    }

    Ok(Material {
        flags,
        color,
        is_textured,
        textures,
        surface_properties,
    })
}

/// Decode the payload of a Texture chunk
pub fn read_texture(mut texture: ChunkReader<'_>, options: &ParseOptions) -> ParseResult<Texture> {
    let (_, mut data) = texture.enter_expected(ChunkType::Struct)?;
    data.require(4)?;
    let filter = data.read_u8()?;
    let addressing = data.read_u8()?;
    let mipmap_flags = data.read_u16()?;
    data.finish();

    let name = read_string_chunk(&mut texture)?;
    let mask = read_string_chunk(&mut texture)?;

    while let Some(child) = texture.read_header()? {
        skip_child(&mut texture, &child, options)?;
    }

    Ok(Texture {
        name,
        mask: (!mask.is_empty()).then_some(mask),
        filter,
        u_addressing: addressing & 0x0F,
        v_addressing: addressing >> 4,
        mipmap_flags,
    })
}

fn read_string_chunk(parent: &mut ChunkReader<'_>) -> ParseResult<String> {
    let (header, mut string) = parent.enter_expected(ChunkType::String)?;
    string.read_string(header.size as usize, true)
}
