//! Non-fatal problems found while rebuilding a scene
//!
//! Each diagnostic names the unit that was skipped; the rest of the import
//! carries on.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Why a triangle did not become a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceRejection {
    /// Two or more corners share a vertex
    Degenerate,
    /// A corner indexes past the vertex array
    IndexOutOfRange,
    /// Same vertex set as an earlier face
    Duplicate,
    /// A directed edge is already used by an earlier face
    NonManifoldEdge,
}

impl fmt::Display for FaceRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaceRejection::Degenerate => "degenerate",
            FaceRejection::IndexOutOfRange => "index out of range",
            FaceRejection::Duplicate => "duplicate face",
            FaceRejection::NonManifoldEdge => "non-manifold edge",
        })
    }
}

/// A non-fatal reconstruction problem
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("geometry {geometry}: triangle {triangle} rejected ({reason})")]
    FaceRejected {
        geometry: usize,
        triangle: usize,
        reason: FaceRejection,
    },

    #[error("texture {} not loaded: {reason}", .path.display())]
    MissingTexture { path: PathBuf, reason: String },

    #[error("frame {frame} ({name}): parent {parent} has no node")]
    DanglingParent { frame: usize, name: String, parent: i32 },

    #[error("atomic {atomic}: frame {frame} out of range ({count} frames)")]
    AtomicFrameOutOfRange { atomic: usize, frame: i32, count: usize },

    #[error("atomic {atomic}: geometry {geometry} out of range ({count} geometries)")]
    AtomicGeometryOutOfRange { atomic: usize, geometry: i32, count: usize },

    #[error("atomic {atomic} replaces atomic {previous} on frame {frame}")]
    DuplicateAtomic { atomic: usize, previous: usize, frame: usize },

    #[error("frame {frame} has a mesh but no name; mesh dropped")]
    UnnamedFrameMesh { frame: usize },

    #[error("geometry {geometry}: triangle {triangle} uses material {material} of {count}")]
    MaterialIndexOutOfRange {
        geometry: usize,
        triangle: usize,
        material: u16,
        count: usize,
    },
}

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Nodes handed to the sink
    pub nodes: usize,
    /// Meshes handed to the sink
    pub meshes: usize,
    /// Materials handed to the sink
    pub materials: usize,
    /// Faces created across all meshes
    pub faces: usize,
    /// Everything that was skipped, in discovery order
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportReport {
    /// Record a diagnostic and log it
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Number of rejected faces
    pub fn rejected_faces(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::FaceRejected { .. }))
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_face_rejections() {
        let mut report = ImportReport::default();
        assert!(report.is_clean());
        report.push(Diagnostic::FaceRejected {
            geometry: 0,
            triangle: 3,
            reason: FaceRejection::Degenerate,
        });
        report.push(Diagnostic::UnnamedFrameMesh { frame: 2 });
        assert_eq!(report.rejected_faces(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_diagnostic_messages() {
        let d = Diagnostic::DanglingParent {
            frame: 4,
            name: "bumper".into(),
            parent: 9,
        };
        assert_eq!(d.to_string(), "frame 4 (bumper): parent 9 has no node");

        let json = serde_json::to_value(Diagnostic::FaceRejected {
            geometry: 1,
            triangle: 0,
            reason: FaceRejection::NonManifoldEdge,
        })
        .unwrap();
        assert_eq!(json["kind"], "face_rejected");
        assert_eq!(json["reason"], "non_manifold_edge");
    }
}
