// dffkit-parsers/src/dff/chunks.rs
//! RenderWare chunk types and headers

use serde::{Deserialize, Serialize};

/// Size of a chunk header on disk: type, size and library id stamp
pub const CHUNK_HEADER_SIZE: usize = 12;

/// Library id stamp written by GTA San Andreas (RenderWare 3.6.0.3)
pub const GTA_SA_LIBRARY_ID: u32 = 0x1803_FFFF;

/// Library id stamp written by GTA III (RenderWare 3.3.0.2)
pub const GTA_III_LIBRARY_ID: u32 = 0x0C02_FFFF;

/// Chunk types found in DFF files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkType {
    /// Fixed-layout payload of the enclosing chunk
    Struct,
    /// Null-terminated, 4-byte padded string
    String,
    /// Plugin container
    Extension,
    /// Texture reference
    Texture,
    /// Material
    Material,
    /// Material list of a geometry
    MaterialList,
    /// Frame hierarchy
    FrameList,
    /// Geometry (vertices, triangles, morph targets)
    Geometry,
    /// Root of a model
    Clump,
    /// Light attached to a clump
    Light,
    /// Camera attached to a clump
    Camera,
    /// Frame/geometry binding
    Atomic,
    /// Geometry container of a clump
    GeometryList,
    /// UV animation dictionary (top level, precedes the clump)
    UvAnimDict,
    /// Skeleton plugin
    HAnim,
    /// Skinning plugin
    Skin,
    /// Triangle strip / split mesh plugin
    BinMesh,
    /// Reflection material plugin
    ReflectionMaterial,
    /// Specular material plugin
    SpecularMaterial,
    /// 2d effects plugin
    Effect2d,
    /// Prelit night colours plugin
    ExtraVertColour,
    /// Collision model plugin
    Collision,
    /// Frame name plugin
    FrameName,
    /// Unknown chunk type
    Unknown(u32),
}

impl ChunkType {
    /// Convert from raw u32 chunk type ID
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0001 => ChunkType::Struct,
            0x0002 => ChunkType::String,
            0x0003 => ChunkType::Extension,
            0x0005 => ChunkType::Camera,
            0x0006 => ChunkType::Texture,
            0x0007 => ChunkType::Material,
            0x0008 => ChunkType::MaterialList,
            0x000E => ChunkType::FrameList,
            0x000F => ChunkType::Geometry,
            0x0010 => ChunkType::Clump,
            0x0012 => ChunkType::Light,
            0x0014 => ChunkType::Atomic,
            0x001A => ChunkType::GeometryList,
            0x002B => ChunkType::UvAnimDict,
            0x011E => ChunkType::HAnim,
            0x0116 => ChunkType::Skin,
            0x050E => ChunkType::BinMesh,
            0x0253_F2F8 => ChunkType::Effect2d,
            0x0253_F2F9 => ChunkType::ExtraVertColour,
            0x0253_F2FA => ChunkType::Collision,
            0x0253_F2FC => ChunkType::ReflectionMaterial,
            0x0253_F2F6 => ChunkType::SpecularMaterial,
            0x0253_F2FE => ChunkType::FrameName,
            other => ChunkType::Unknown(other),
        }
    }

    /// Convert to raw u32 chunk type ID
    pub fn to_u32(&self) -> u32 {
        match self {
            ChunkType::Struct => 0x0001,
            ChunkType::String => 0x0002,
            ChunkType::Extension => 0x0003,
            ChunkType::Camera => 0x0005,
            ChunkType::Texture => 0x0006,
            ChunkType::Material => 0x0007,
            ChunkType::MaterialList => 0x0008,
            ChunkType::FrameList => 0x000E,
            ChunkType::Geometry => 0x000F,
            ChunkType::Clump => 0x0010,
            ChunkType::Light => 0x0012,
            ChunkType::Atomic => 0x0014,
            ChunkType::GeometryList => 0x001A,
            ChunkType::UvAnimDict => 0x002B,
            ChunkType::HAnim => 0x011E,
            ChunkType::Skin => 0x0116,
            ChunkType::BinMesh => 0x050E,
            ChunkType::Effect2d => 0x0253_F2F8,
            ChunkType::ExtraVertColour => 0x0253_F2F9,
            ChunkType::Collision => 0x0253_F2FA,
            ChunkType::ReflectionMaterial => 0x0253_F2FC,
            ChunkType::SpecularMaterial => 0x0253_F2F6,
            ChunkType::FrameName => 0x0253_F2FE,
            ChunkType::Unknown(v) => *v,
        }
    }

    /// Check if this is a plugin chunk (only ever found inside an Extension)
    pub fn is_plugin(&self) -> bool {
        matches!(
            self,
            ChunkType::HAnim
                | ChunkType::Skin
                | ChunkType::BinMesh
                | ChunkType::Effect2d
                | ChunkType::ExtraVertColour
                | ChunkType::Collision
                | ChunkType::ReflectionMaterial
                | ChunkType::SpecularMaterial
                | ChunkType::FrameName
        )
    }

    /// Display name used in logs and error messages
    pub fn name(&self) -> String {
        match self {
            ChunkType::Struct => "Struct".into(),
            ChunkType::String => "String".into(),
            ChunkType::Extension => "Extension".into(),
            ChunkType::Texture => "Texture".into(),
            ChunkType::Material => "Material".into(),
            ChunkType::MaterialList => "Material List".into(),
            ChunkType::FrameList => "Frame List".into(),
            ChunkType::Geometry => "Geometry".into(),
            ChunkType::Clump => "Clump".into(),
            ChunkType::Light => "Light".into(),
            ChunkType::Camera => "Camera".into(),
            ChunkType::Atomic => "Atomic".into(),
            ChunkType::GeometryList => "Geometry List".into(),
            ChunkType::UvAnimDict => "UV Animation Dictionary".into(),
            ChunkType::HAnim => "HAnim PLG".into(),
            ChunkType::Skin => "Skin PLG".into(),
            ChunkType::BinMesh => "Bin Mesh PLG".into(),
            ChunkType::Effect2d => "2d Effect".into(),
            ChunkType::ExtraVertColour => "Extra Vert Colour".into(),
            ChunkType::Collision => "Collision Model".into(),
            ChunkType::ReflectionMaterial => "Reflection Material".into(),
            ChunkType::SpecularMaterial => "Specular Material".into(),
            ChunkType::FrameName => "Frame".into(),
            ChunkType::Unknown(v) => format!("Unknown(0x{v:08X})"),
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHeader {
    /// Chunk type
    pub chunk_type: ChunkType,
    /// Payload size in bytes, excluding this header
    pub size: u32,
    /// Raw library id stamp
    pub library_id: u32,
    /// Absolute offset of the header in the stream
    pub offset: u64,
}

impl ChunkHeader {
    /// Decoded RenderWare version, e.g. `0x36003` for 3.6.0.3
    pub fn version(&self) -> u32 {
        decode_library_id(self.library_id)
    }

    /// Offset of the first payload byte
    pub fn payload_offset(&self) -> u64 {
        self.offset + CHUNK_HEADER_SIZE as u64
    }

    /// Offset just past the payload
    pub fn end_offset(&self) -> u64 {
        self.payload_offset() + u64::from(self.size)
    }
}

/// Decode a library id stamp into a RenderWare version number.
///
/// Stamps from 3.1 onwards pack the version into the high half; older files
/// store the plain version shifted down by 8 bits.
pub fn decode_library_id(stamp: u32) -> u32 {
    if stamp & 0xFFFF_0000 != 0 {
        (((stamp >> 14) & 0x3FF00) + 0x30000) | ((stamp >> 16) & 0x3F)
    } else {
        stamp << 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_type_roundtrip() {
        let types = [
            ChunkType::Clump,
            ChunkType::FrameList,
            ChunkType::FrameName,
            ChunkType::BinMesh,
            ChunkType::Unknown(0xDEAD),
        ];

        for ct in types {
            let value = ct.to_u32();
            let restored = ChunkType::from_u32(value);
            assert_eq!(ct, restored);
        }
    }

    #[test]
    fn test_chunk_type_is_plugin() {
        assert!(ChunkType::FrameName.is_plugin());
        assert!(ChunkType::HAnim.is_plugin());
        assert!(!ChunkType::Geometry.is_plugin());
    }

    #[test]
    fn test_library_id_decoding() {
        assert_eq!(decode_library_id(GTA_SA_LIBRARY_ID), 0x36003);
        assert_eq!(decode_library_id(GTA_III_LIBRARY_ID), 0x33002);
        // pre-3.1 files store the version directly
        assert_eq!(decode_library_id(0x0310), 0x31000);
    }

    #[test]
    fn test_header_offsets() {
        let header = ChunkHeader {
            chunk_type: ChunkType::Struct,
            size: 8,
            library_id: GTA_SA_LIBRARY_ID,
            offset: 24,
        };
        assert_eq!(header.payload_offset(), 36);
        assert_eq!(header.end_offset(), 44);
        assert_eq!(header.version(), 0x36003);
    }
}
