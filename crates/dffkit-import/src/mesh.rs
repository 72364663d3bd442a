//! Geometry → host mesh conversion

use std::collections::HashSet;

use dffkit_core::{Vec2, Vec3};
use dffkit_parsers::Geometry;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, FaceRejection};
use crate::sink::MaterialHandle;

/// One triangle of a built mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltFace {
    /// Indices into [`BuiltMesh::vertices`]
    pub vertices: [u32; 3],
    /// Index into [`BuiltMesh::material_slots`]
    pub material: Option<usize>,
    /// Smooth shading flag, set on every built face
    pub smooth: bool,
}

/// Mesh ready to be handed to a sink.
///
/// Vertices keep the source geometry's order. UVs and normals are stored per
/// face corner ("loop"), three per face, in face order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuiltMesh {
    /// Name of the frame the mesh is bound to
    pub name: String,
    /// Vertex positions, shared between faces
    pub vertices: Vec<Vec3>,
    /// Faces that passed validation, in source order
    pub faces: Vec<BuiltFace>,
    /// One channel per UV layer, V already flipped
    pub uv_layers: Vec<Vec<Vec2>>,
    /// Split normals, present when the geometry had normals
    pub loop_normals: Option<Vec<Vec3>>,
    /// Materials referenced by [`BuiltFace::material`]
    pub material_slots: Vec<MaterialHandle>,
}

impl BuiltMesh {
    pub fn loop_count(&self) -> usize {
        self.faces.len() * 3
    }
}

/// Result of building one geometry
#[derive(Debug)]
pub struct MeshBuild {
    pub mesh: BuiltMesh,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turns decoded geometry into [`BuiltMesh`] values
#[derive(Debug, Clone, Copy)]
pub struct MeshBuilder {
    import_normals: bool,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self { import_normals: true }
    }
}

impl MeshBuilder {
    pub fn new(import_normals: bool) -> Self {
        Self { import_normals }
    }

    /// Build the mesh for geometry `index`.
    ///
    /// Bad triangles are dropped one at a time and reported; they never stop
    /// the rest of the mesh from being built.
    pub fn build(&self, geometry: &Geometry, index: usize, name: impl Into<String>) -> MeshBuild {
        let vertex_count = geometry.vertices.len();
        let material_count = geometry.materials.len();
        let mut diagnostics = Vec::new();
        let mut faces = Vec::with_capacity(geometry.triangles.len());
        let mut seen_faces: HashSet<[u32; 3]> = HashSet::new();
        let mut used_edges: HashSet<(u32, u32)> = HashSet::new();

        for (t, triangle) in geometry.triangles.iter().enumerate() {
            let corners = triangle.indices().map(u32::from);

            if let Err(reason) = check_face(corners, vertex_count, &seen_faces, &used_edges) {
                diagnostics.push(Diagnostic::FaceRejected {
                    geometry: index,
                    triangle: t,
                    reason,
                });
                continue;
            }

            let mut key = corners;
            key.sort_unstable();
            seen_faces.insert(key);
            for edge in directed_edges(corners) {
                used_edges.insert(edge);
            }

            let slot = usize::from(triangle.material);
            let material = if slot < material_count {
                Some(slot)
            } else {
                // geometry with no material list at all has nothing to bind
                if material_count > 0 {
                    diagnostics.push(Diagnostic::MaterialIndexOutOfRange {
                        geometry: index,
                        triangle: t,
                        material: triangle.material,
                        count: material_count,
                    });
                }
                None
            };

            faces.push(BuiltFace {
                vertices: corners,
                material,
                smooth: true,
            });
        }

        let uv_layers = geometry
            .uv_layers
            .iter()
            .map(|layer| {
                faces
                    .iter()
                    .flat_map(|f| f.vertices)
                    .map(|v| {
                        let uv = layer.get(v as usize).copied().unwrap_or_default();
                        Vec2::new(uv.x, 1.0 - uv.y)
                    })
                    .collect()
            })
            .collect();

        let loop_normals = match &geometry.normals {
            Some(normals) if self.import_normals => Some(
                faces
                    .iter()
                    .flat_map(|f| f.vertices)
                    .map(|v| normals.get(v as usize).copied().unwrap_or_default())
                    .collect(),
            ),
            _ => None,
        };

        tracing::debug!(
            geometry = index,
            vertices = vertex_count,
            faces = faces.len(),
            rejected = diagnostics
                .iter()
                .filter(|d| matches!(d, Diagnostic::FaceRejected { .. }))
                .count(),
            "built mesh"
        );

        MeshBuild {
            mesh: BuiltMesh {
                name: name.into(),
                vertices: geometry.vertices.clone(),
                faces,
                uv_layers,
                loop_normals,
                material_slots: Vec::new(),
            },
            diagnostics,
        }
    }
}

fn directed_edges([a, b, c]: [u32; 3]) -> [(u32, u32); 3] {
    [(a, b), (b, c), (c, a)]
}

fn check_face(
    corners: [u32; 3],
    vertex_count: usize,
    seen_faces: &HashSet<[u32; 3]>,
    used_edges: &HashSet<(u32, u32)>,
) -> Result<(), FaceRejection> {
    let [a, b, c] = corners;
    if a == b || b == c || a == c {
        return Err(FaceRejection::Degenerate);
    }
    if corners.iter().any(|&v| v as usize >= vertex_count) {
        return Err(FaceRejection::IndexOutOfRange);
    }
    let mut key = corners;
    key.sort_unstable();
    if seen_faces.contains(&key) {
        return Err(FaceRejection::Duplicate);
    }
    if directed_edges(corners).iter().any(|e| used_edges.contains(e)) {
        return Err(FaceRejection::NonManifoldEdge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dffkit_parsers::{Material, Triangle};

    fn quad() -> Geometry {
        Geometry {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            triangles: vec![Triangle::new(0, 1, 2, 0), Triangle::new(0, 2, 3, 0)],
            morph_target_count: 1,
            ..Geometry::default()
        }
    }

    fn rejections(build: &MeshBuild) -> Vec<(usize, FaceRejection)> {
        build
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::FaceRejected { triangle, reason, .. } => Some((*triangle, *reason)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_vertices_keep_source_order() {
        let geometry = quad();
        let build = MeshBuilder::default().build(&geometry, 0, "quad");
        assert_eq!(build.mesh.vertices, geometry.vertices);
        assert_eq!(build.mesh.faces.len(), 2);
        assert!(build.mesh.faces.iter().all(|f| f.smooth));
        assert_eq!(build.mesh.faces[1].vertices, [0, 2, 3]);
        assert!(build.diagnostics.is_empty());
    }

    #[test]
    fn test_degenerate_triangle_skipped() {
        let mut geometry = quad();
        geometry.triangles = vec![Triangle::new(0, 0, 1, 0), Triangle::new(0, 1, 2, 0)];
        let build = MeshBuilder::default().build(&geometry, 3, "m");
        assert_eq!(build.mesh.faces.len(), 1);
        assert_eq!(rejections(&build), vec![(0, FaceRejection::Degenerate)]);
    }

    #[test]
    fn test_rejection_reasons() {
        let mut geometry = quad();
        geometry.triangles = vec![
            Triangle::new(0, 1, 2, 0),
            Triangle::new(0, 1, 9, 0),
            Triangle::new(2, 1, 0, 0),
            Triangle::new(0, 1, 3, 0),
            Triangle::new(1, 0, 3, 0),
        ];
        let build = MeshBuilder::default().build(&geometry, 0, "m");
        assert_eq!(
            rejections(&build),
            vec![
                (1, FaceRejection::IndexOutOfRange),
                (2, FaceRejection::Duplicate),
                (3, FaceRejection::NonManifoldEdge),
            ]
        );
        // the reversed winding shares no directed edge with face 0
        assert_eq!(build.mesh.faces.len(), 2);
        for face in &build.mesh.faces {
            assert!(face.vertices.iter().all(|&v| (v as usize) < build.mesh.vertices.len()));
        }
    }

    #[test]
    fn test_fin_on_shared_edge_rejected() {
        // three faces hinged on edge 0-1; the third repeats the second's winding
        let mut geometry = quad();
        geometry.vertices.push(Vec3::new(0.5, -1.0, 0.0));
        geometry.triangles = vec![
            Triangle::new(0, 1, 2, 0),
            Triangle::new(1, 0, 4, 0),
            Triangle::new(1, 0, 3, 0),
        ];
        let build = MeshBuilder::default().build(&geometry, 0, "m");
        assert_eq!(rejections(&build), vec![(2, FaceRejection::NonManifoldEdge)]);
        assert_eq!(build.mesh.faces.len(), 2);
    }

    #[test]
    fn test_uvs_are_per_loop_and_flipped() {
        let mut geometry = quad();
        geometry.uv_layers = vec![vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.25),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 0.75),
        ]];
        let build = MeshBuilder::default().build(&geometry, 0, "m");
        let layer = &build.mesh.uv_layers[0];
        assert_eq!(layer.len(), build.mesh.loop_count());
        for (face_index, face) in build.mesh.faces.iter().enumerate() {
            for (corner, &v) in face.vertices.iter().enumerate() {
                let source = geometry.uv_layers[0][v as usize];
                let built = layer[face_index * 3 + corner];
                assert_eq!(built.x, source.x);
                assert_eq!(built.y, 1.0 - source.y);
            }
        }
    }

    #[test]
    fn test_split_normals_follow_option() {
        let mut geometry = quad();
        geometry.normals = Some(vec![Vec3::Z; 4]);

        let with = MeshBuilder::new(true).build(&geometry, 0, "m");
        assert_eq!(with.mesh.loop_normals.as_ref().map(Vec::len), Some(6));

        let without = MeshBuilder::new(false).build(&geometry, 0, "m");
        assert!(without.mesh.loop_normals.is_none());
    }

    #[test]
    fn test_material_out_of_range_keeps_face() {
        let mut geometry = quad();
        geometry.materials = vec![Material::default()];
        geometry.triangles[1].material = 4;
        let build = MeshBuilder::default().build(&geometry, 0, "m");
        assert_eq!(build.mesh.faces.len(), 2);
        assert_eq!(build.mesh.faces[0].material, Some(0));
        assert_eq!(build.mesh.faces[1].material, None);
        assert!(matches!(
            build.diagnostics[0],
            Diagnostic::MaterialIndexOutOfRange { triangle: 1, material: 4, count: 1, .. }
        ));
    }

    #[test]
    fn test_empty_geometry_gives_empty_mesh() {
        let build = MeshBuilder::default().build(&Geometry::default(), 0, "empty");
        assert!(build.mesh.faces.is_empty());
        assert!(build.mesh.vertices.is_empty());
    }
}
