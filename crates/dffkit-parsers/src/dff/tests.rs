//! Decoding tests for the DFF parser
//!
//! These tests run synthetic streams through the full decoder:
//! - Clump, frame, geometry, material and atomic records
//! - Unknown-chunk and extra top-level chunk handling
//! - Fatal errors with offsets and chunk names
//! - File, memory-mapped and progress-reporting entry points

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use dffkit_core::{Color, Mat3, Vec2, Vec3};

use super::fixtures::{self, chunk, simple_geometry, DffBuilder};
use super::*;
use crate::traits::{
    HierarchicalParser, HumanReadable, ParseError, ParseOptions, ParsePhase, ParseProgress, Parser,
};

fn decode(bytes: &[u8]) -> ParseResult<DffModel> {
    DffParser::new().parse(Cursor::new(bytes))
}

fn decode_strict(bytes: &[u8]) -> ParseResult<DffModel> {
    let options = ParseOptions {
        skip_unknown_chunks: false,
        ..ParseOptions::default()
    };
    DffParser::new().parse_with_options(Cursor::new(bytes), &options, None)
}

fn triangle_geometry() -> Geometry {
    simple_geometry(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        vec![Triangle::new(0, 1, 2, 0)],
    )
}

fn textured_material(name: &str) -> Material {
    Material {
        color: Color::new(200, 100, 50, 255),
        is_textured: true,
        textures: vec![Texture {
            name: name.to_string(),
            mask: Some(format!("{name}_a")),
            filter: 6,
            u_addressing: 1,
            v_addressing: 2,
            mipmap_flags: 0,
        }],
        surface_properties: Some(SurfaceProperties::new(1.0, 0.3, 0.7)),
        ..Material::default()
    }
}

/// Geometry chunk with a hand-written material list
fn geometry_with_material_list(indices: &[i32], materials: &[Material]) -> Vec<u8> {
    let lib = GTA_SA_LIBRARY_ID;
    let geometry = triangle_geometry();
    let mut payload = chunk(ChunkType::Struct, lib, &fixtures::encode_geometry_struct(&geometry, lib));
    payload.extend(fixtures::encode_material_list(indices, materials, lib));
    chunk(ChunkType::Geometry, lib, &payload)
}

/// Clump holding one frame and the given raw geometry chunk
fn clump_with_geometry_chunk(geometry: Vec<u8>) -> Vec<u8> {
    let lib = GTA_SA_LIBRARY_ID;
    let frames = vec![Frame {
        name: Some("root".into()),
        ..Frame::default()
    }];
    let mut payload = chunk(ChunkType::Struct, lib, &1i32.to_le_bytes());
    payload.extend(fixtures::encode_frame_list(&frames, lib));
    let mut list = chunk(ChunkType::Struct, lib, &1u32.to_le_bytes());
    list.extend(geometry);
    payload.extend(chunk(ChunkType::GeometryList, lib, &list));
    payload.extend(fixtures::encode_atomic(&Atomic::new(0, 0), None, lib));
    chunk(ChunkType::Clump, lib, &payload)
}

mod clump_tests {
    use super::*;

    #[test]
    fn test_single_triangle_model() {
        let bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(triangle_geometry())
            .atomic(0, 0)
            .build();

        let model = decode(&bytes).unwrap();
        assert_eq!(model.version, 0x36003);
        assert_eq!(model.library_id, GTA_SA_LIBRARY_ID);
        assert_eq!(model.frames.len(), 1);
        assert_eq!(model.frames[0].name.as_deref(), Some("root"));
        assert_eq!(model.frames[0].parent, -1);
        assert_eq!(model.frames[0].rotation, Mat3::IDENTITY);

        let geometry = &model.geometries[0];
        assert_eq!(geometry.vertices.len(), 3);
        assert_eq!(geometry.triangles, vec![Triangle::new(0, 1, 2, 0)]);
        assert!(geometry.uv_layers.is_empty());
        assert!(!geometry.has_normals());
        assert_eq!(model.atomics, vec![Atomic::new(0, 0)]);
    }

    #[test]
    fn test_frame_hierarchy_and_names() {
        let bytes = DffBuilder::new()
            .named_frame("car", -1, Vec3::ZERO)
            .frame(Frame {
                name: None,
                position: Vec3::new(1.0, 2.0, 3.0),
                parent: 0,
                ..Frame::default()
            })
            .named_frame("wheel_lf_dummy", 0, Vec3::new(-0.8, 1.2, -0.3))
            .build();

        let model = decode(&bytes).unwrap();
        assert_eq!(model.frames.len(), 3);
        assert_eq!(model.frames[1].name, None);
        assert_eq!(model.frames[1].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(model.frames[2].name.as_deref(), Some("wheel_lf_dummy"));
        assert_eq!(model.children_of(0), vec![1, 2]);
        assert_eq!(model.root_frames(), vec![0]);
    }

    #[test]
    fn test_frame_name_trimmed_at_first_null() {
        let lib = GTA_SA_LIBRARY_ID;
        let mut data = 1i32.to_le_bytes().to_vec();
        for v in [1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        let mut list = chunk(ChunkType::Struct, lib, &data);
        let plugin = chunk(ChunkType::FrameName, lib, b"chassis\0\0\0");
        list.extend(chunk(ChunkType::Extension, lib, &plugin));
        let frame_list = chunk(ChunkType::FrameList, lib, &list);

        let mut payload = chunk(ChunkType::Struct, lib, &0i32.to_le_bytes());
        payload.extend(frame_list);
        let bytes = chunk(ChunkType::Clump, lib, &payload);

        let model = decode(&bytes).unwrap();
        assert_eq!(model.frames[0].name.as_deref(), Some("chassis"));
        assert!(model.geometries.is_empty());
    }

    #[test]
    fn test_uvs_normals_and_prelit() {
        let mut geometry = triangle_geometry();
        geometry.uv_layers = vec![
            vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 0.25)],
            vec![Vec2::new(0.5, 0.5); 3],
        ];
        geometry.normals = Some(vec![Vec3::Z; 3]);
        geometry.prelit = Some(vec![Color::new(10, 20, 30, 40); 3]);
        geometry.triangles = vec![Triangle::new(2, 0, 1, 0)];

        let bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(geometry.clone())
            .atomic(0, 0)
            .build();

        let decoded = &decode(&bytes).unwrap().geometries[0];
        assert_eq!(decoded.uv_layers, geometry.uv_layers);
        assert_eq!(decoded.normals, geometry.normals);
        assert_eq!(decoded.prelit, geometry.prelit);
        assert_eq!(decoded.triangles, vec![Triangle::new(2, 0, 1, 0)]);
        assert!(decoded.flags.contains(GeometryFlags::TEXTURED2));
        assert!(decoded.flags.contains(GeometryFlags::NORMALS));
    }

    #[test]
    fn test_old_geometry_carries_surface_properties() {
        let mut geometry = triangle_geometry();
        geometry.surface_properties = Some(SurfaceProperties::new(1.0, 0.2, 0.5));

        let bytes = DffBuilder::new()
            .library_id(GTA_III_LIBRARY_ID)
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(geometry)
            .atomic(0, 0)
            .build();

        let model = decode(&bytes).unwrap();
        assert_eq!(model.version, 0x33002);
        assert_eq!(
            model.geometries[0].surface_properties,
            Some(SurfaceProperties::new(1.0, 0.2, 0.5))
        );
    }

    #[test]
    fn test_new_geometry_has_no_embedded_surface_properties() {
        let bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(triangle_geometry())
            .build();

        assert_eq!(decode(&bytes).unwrap().geometries[0].surface_properties, None);
    }

    #[test]
    fn test_inline_atomic_geometry_is_appended() {
        let bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .named_frame("door", 0, Vec3::X)
            .geometry(triangle_geometry())
            .atomic(0, 0)
            .atomic_with_inline_geometry(1, triangle_geometry())
            .build();

        let model = decode(&bytes).unwrap();
        assert_eq!(model.geometries.len(), 2);
        assert_eq!(model.atomics[1].frame, 1);
        assert_eq!(model.atomics[1].geometry, 1);
    }

    #[test]
    fn test_native_geometry_is_empty() {
        let lib = GTA_SA_LIBRARY_ID;
        let mut data = GeometryFlags::NATIVE.to_le_bytes().to_vec();
        for count in [12i32, 30, 1] {
            data.extend_from_slice(&count.to_le_bytes());
        }
        data.extend_from_slice(&[0xAB; 40]);
        let mut payload = chunk(ChunkType::Struct, lib, &data);
        payload.extend(fixtures::encode_material_list(&[], &[], lib));
        let model = decode(&clump_with_geometry_chunk(chunk(ChunkType::Geometry, lib, &payload))).unwrap();

        let geometry = &model.geometries[0];
        assert!(geometry.is_native());
        assert!(geometry.vertices.is_empty());
        assert!(geometry.triangles.is_empty());
    }
}

mod material_tests {
    use super::*;

    #[test]
    fn test_textured_material() {
        let mut geometry = triangle_geometry();
        geometry.materials = vec![textured_material("body"), Material::default()];

        let bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(geometry)
            .atomic(0, 0)
            .build();

        let model = decode(&bytes).unwrap();
        let materials = &model.geometries[0].materials;
        assert_eq!(materials.len(), 2);
        assert_eq!(materials[0], textured_material("body"));
        assert_eq!(materials[0].color, Color::new(200, 100, 50, 255));
        let texture = materials[0].primary_texture().unwrap();
        assert_eq!(texture.name, "body");
        assert_eq!(texture.mask.as_deref(), Some("body_a"));
        assert_eq!((texture.u_addressing, texture.v_addressing), (1, 2));
        assert!(materials[1].primary_texture().is_none());
        assert_eq!(model.texture_names(), vec!["body"]);
    }

    #[test]
    fn test_material_reuse_index() {
        let bytes = clump_with_geometry_chunk(geometry_with_material_list(
            &[-1, 0, -1],
            &[textured_material("a"), textured_material("b")],
        ));

        let materials = decode(&bytes).unwrap().geometries.remove(0).materials;
        assert_eq!(materials.len(), 3);
        assert_eq!(materials[1], materials[0]);
        assert_eq!(materials[2].textures[0].name, "b");
    }

    #[test]
    fn test_material_forward_reuse_is_malformed() {
        let bytes = clump_with_geometry_chunk(geometry_with_material_list(
            &[1, -1],
            &[textured_material("a")],
        ));

        match decode(&bytes) {
            Err(err) => {
                assert_eq!(err.chunk().as_deref(), Some("Material List"));
                assert!(err.to_string().contains("reuses slot 1"));
            }
            Ok(_) => panic!("forward reuse must be rejected"),
        }
    }

    #[test]
    fn test_old_material_has_no_surface_properties() {
        // 0x0302 predates the material surface properties
        let mut geometry = triangle_geometry();
        geometry.materials = vec![Material::default()];
        let bytes = DffBuilder::new()
            .library_id(0x0302)
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(geometry)
            .build();

        let model = decode(&bytes).unwrap();
        assert_eq!(model.version, 0x30200);
        assert_eq!(model.geometries[0].materials[0].surface_properties, None);
        assert!(model.geometries[0].surface_properties.is_some());
    }

    #[test]
    fn test_unterminated_texture_name_is_invalid_string() {
        let lib = GTA_SA_LIBRARY_ID;
        let mut texture = chunk(ChunkType::Struct, lib, &[6, 0x11, 0, 0]);
        texture.extend(chunk(ChunkType::String, lib, b"body"));
        texture.extend(fixtures::string_chunk("", lib));
        let texture = chunk(ChunkType::Texture, lib, &texture);

        let mut material = fixtures::encode_material(
            &Material {
                is_textured: true,
                ..Material::default()
            },
            lib,
        );
        // splice the broken texture in front of the material's extension
        let material_payload_len = material.len() - 12;
        material.truncate(material.len() - 12);
        material.extend(texture.iter().copied());
        material.extend(chunk(ChunkType::Extension, lib, &[]));
        let new_len = (material_payload_len + texture.len()) as u32;
        material[4..8].copy_from_slice(&new_len.to_le_bytes());

        let mut list = chunk(ChunkType::Struct, lib, &[1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        list.extend(material);
        let list = chunk(ChunkType::MaterialList, lib, &list);

        let mut geometry = chunk(
            ChunkType::Struct,
            lib,
            &fixtures::encode_geometry_struct(&triangle_geometry(), lib),
        );
        geometry.extend(list);
        let bytes = clump_with_geometry_chunk(chunk(ChunkType::Geometry, lib, &geometry));

        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.chunk().as_deref(), Some("String"));
        assert!(err.to_string().contains("Unterminated string"));
    }
}

mod chunk_policy_tests {
    use super::*;

    fn with_unknown_chunk() -> Vec<u8> {
        DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(triangle_geometry())
            .atomic(0, 0)
            .clump_chunk(chunk(ChunkType::Unknown(0x0BAD_C0DE), GTA_SA_LIBRARY_ID, &[1, 2, 3, 4, 5]))
            .build()
    }

    #[test]
    fn test_unknown_chunk_is_skipped() {
        let model = decode(&with_unknown_chunk()).unwrap();
        assert_eq!(model.atomics.len(), 1);
    }

    #[test]
    fn test_unknown_chunk_rejected_in_strict_mode() {
        match decode_strict(&with_unknown_chunk()) {
            Err(ParseError::UnknownChunkType { chunk_type, .. }) => assert_eq!(chunk_type, 0x0BAD_C0DE),
            other => panic!("expected UnknownChunkType, got {other:?}"),
        }
    }

    #[test]
    fn test_known_plugins_skipped_in_strict_mode() {
        let bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .clump_chunk(chunk(ChunkType::Light, GTA_SA_LIBRARY_ID, &[0; 8]))
            .build();
        assert!(decode_strict(&bytes).is_ok());
    }

    #[test]
    fn test_leading_chunks_and_second_clump_skipped() {
        let first = DffBuilder::new()
            .leading_chunk(chunk(ChunkType::UvAnimDict, GTA_SA_LIBRARY_ID, &[0; 4]))
            .named_frame("first", -1, Vec3::ZERO)
            .build();
        let second = DffBuilder::new().named_frame("second", -1, Vec3::ZERO).build();
        let mut bytes = first;
        bytes.extend(second);
        bytes.extend_from_slice(&[0, 0]); // padding

        let model = decode(&bytes).unwrap();
        assert_eq!(model.frames.len(), 1);
        assert_eq!(model.frames[0].name.as_deref(), Some("first"));
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_empty_stream_has_no_clump() {
        assert!(matches!(decode(&[]), Err(ParseError::MissingChunk { .. })));
    }

    #[test]
    fn test_truncated_stream() {
        let mut bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .geometry(triangle_geometry())
            .atomic(0, 0)
            .build();
        bytes.truncate(bytes.len() - 20);

        match decode(&bytes) {
            Err(ParseError::Truncated { chunk, offset, .. }) => {
                assert_eq!(chunk, "Clump");
                assert_eq!(offset, 12);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_short_atomic_struct_is_malformed() {
        let lib = GTA_SA_LIBRARY_ID;
        let short = chunk(ChunkType::Struct, lib, &0i32.to_le_bytes());
        let atomic = chunk(ChunkType::Atomic, lib, &short);
        let bytes = DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .clump_chunk(atomic)
            .build();

        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.chunk().as_deref(), Some("Atomic struct"));
        assert!(err.offset().is_some());
        assert!(err.to_string().contains("needs 8"));
    }

    #[test]
    fn test_geometry_count_mismatch_is_malformed() {
        let lib = GTA_SA_LIBRARY_ID;
        let mut list = chunk(ChunkType::Struct, lib, &2u32.to_le_bytes());
        list.extend(fixtures::encode_geometry(&triangle_geometry(), lib));
        let mut payload = chunk(ChunkType::Struct, lib, &0i32.to_le_bytes());
        payload.extend(fixtures::encode_frame_list(&[Frame::default()], lib));
        payload.extend(chunk(ChunkType::GeometryList, lib, &list));
        let bytes = chunk(ChunkType::Clump, lib, &payload);

        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.chunk().as_deref(), Some("Geometry List"));
        assert!(err.to_string().contains("declares 2 geometries, found 1"));
    }

    #[test]
    fn test_short_vertex_array_is_malformed() {
        let lib = GTA_SA_LIBRARY_ID;
        let mut data = fixtures::encode_geometry_struct(&triangle_geometry(), lib);
        data.truncate(data.len() - 4);
        let mut payload = chunk(ChunkType::Struct, lib, &data);
        payload.extend(fixtures::encode_material_list(&[], &[], lib));
        let bytes = clump_with_geometry_chunk(chunk(ChunkType::Geometry, lib, &payload));

        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.chunk().as_deref(), Some("Geometry struct"));
    }

    #[test]
    fn test_missing_frame_list() {
        let lib = GTA_SA_LIBRARY_ID;
        let payload = chunk(ChunkType::Struct, lib, &0i32.to_le_bytes());
        let bytes = chunk(ChunkType::Clump, lib, &payload);
        match decode(&bytes) {
            Err(ParseError::MissingChunk { chunk, context }) => {
                assert_eq!(chunk, "Frame List");
                assert_eq!(context, "Clump");
            }
            other => panic!("expected MissingChunk, got {other:?}"),
        }
    }
}

mod entry_point_tests {
    use super::*;

    fn sample() -> Vec<u8> {
        DffBuilder::new()
            .named_frame("root", -1, Vec3::ZERO)
            .named_frame("child", 0, Vec3::Y)
            .geometry(triangle_geometry())
            .atomic(1, 0)
            .build()
    }

    #[test]
    fn test_parse_file_and_memory_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.dff");
        std::fs::write(&path, sample()).unwrap();

        let parser = DffParser::new();
        assert!(parser.can_parse(&path));
        assert!(parser.can_parse(&dir.path().join("PLAYER.DFF")));
        assert!(!parser.can_parse(&dir.path().join("player.txd")));
        assert!(!parser.can_parse(&dir.path().join("player")));
        let buffered = parser.parse_file(&path).unwrap();

        let mapped_options = ParseOptions {
            memory_mapping_threshold: 0,
            ..ParseOptions::default()
        };
        let mapped = parser.parse_file_with_options(&path, &mapped_options, None).unwrap();
        assert_eq!(buffered, mapped);
    }

    #[test]
    fn test_progress_phases() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);
        let options = ParseOptions {
            strict_validation: true,
            ..ParseOptions::default()
        };

        DffParser::new()
            .parse_with_options(
                Cursor::new(sample()),
                &options,
                Some(Box::new(move |p: ParseProgress| sink.lock().unwrap().push(p.phase))),
            )
            .unwrap();

        let phases = phases.lock().unwrap();
        assert_eq!(phases.first(), Some(&ParsePhase::ReadingHeader));
        assert!(phases.contains(&ParsePhase::LinkingReferences));
        assert_eq!(phases.last(), Some(&ParsePhase::Complete));
    }

    #[test]
    fn test_hierarchy_views() {
        let parser = DffParser::new();
        let model = parser.parse(Cursor::new(sample())).unwrap();

        let roots = parser.roots(&model);
        assert_eq!(roots.len(), 1);
        let children = parser.children(&model, roots[0]);
        assert_eq!(children[0].name.as_deref(), Some("child"));
        assert!(parser.is_leaf(&model, children[0]));

        assert_eq!(model.frame_tree(), "[0] root\n  [1] child (mesh)\n");
    }

    #[test]
    fn test_reference_problems() {
        let model = DffModel {
            frames: vec![Frame { parent: 1, ..Frame::default() }, Frame::default()],
            atomics: vec![Atomic::new(5, -1)],
            ..DffModel::default()
        };
        let problems = model.reference_problems();
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("frame 5"));
        assert!(problems[1].contains("geometry -1"));
        assert!(problems[2].contains("frame 0 has parent 1"));
    }

    #[test]
    fn test_human_readable_output() {
        let model = decode(&sample()).unwrap();
        let text = model.to_readable_string();
        assert!(text.contains("RenderWare 3.6.0.3"));
        assert!(text.contains("Frames: 2"));

        let json = model.to_json();
        assert_eq!(json["frames"][1]["name"], "child");
        assert_eq!(json["geometries"][0]["triangles"], 1);

        assert!(model.to_yaml().contains("3.6.0.3"));
    }
}
