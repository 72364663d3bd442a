//! DFF model → host scene
//!
//! An import runs in three passes over one decoded [`DffModel`]:
//! 1. bind atomics to frames (one mesh per frame, last atomic wins)
//! 2. build each bound frame's mesh and its geometry's materials
//! 3. emit nodes for named frames and link parents
//!
//! Everything mutable lives in an [`ImportState`] created per call, so one
//! [`DffImporter`] can serve many threads.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use dffkit_core::{Error, Result, ResultExt};
use dffkit_parsers::{DffModel, DffParser, Parser};

use crate::config::ImportOptions;
use crate::diagnostics::{Diagnostic, ImportReport};
use crate::hierarchy;
use crate::material::MaterialResolver;
use crate::mesh::MeshBuilder;
use crate::sink::{MaterialHandle, MeshHandle, NodeHandle, SceneSink};
use crate::textures::{FsTextureLoader, TextureLoader};

/// Mutable state of one import call
#[derive(Debug)]
pub(crate) struct ImportState {
    /// Frame index → (atomic index, geometry index)
    pub(crate) atomics_by_frame: BTreeMap<usize, (usize, usize)>,
    /// Frame index → mesh handed to the sink
    pub(crate) meshes_by_frame: HashMap<usize, MeshHandle>,
    /// Frame index → node, `None` for frames without a node (yet)
    pub(crate) nodes_by_frame: Vec<Option<NodeHandle>>,
    /// Geometry index → material handles, one per material slot
    pub(crate) materials_by_geometry: HashMap<usize, Vec<MaterialHandle>>,
    pub(crate) report: ImportReport,
}

impl ImportState {
    pub(crate) fn new(model: &DffModel) -> Self {
        Self {
            atomics_by_frame: BTreeMap::new(),
            meshes_by_frame: HashMap::new(),
            nodes_by_frame: vec![None; model.frames.len()],
            materials_by_geometry: HashMap::new(),
            report: ImportReport::default(),
        }
    }

    /// Validate atomics and record which geometry each frame shows
    fn bind_atomics(&mut self, model: &DffModel) {
        let frame_count = model.frames.len();
        let geometry_count = model.geometries.len();

        for (index, atomic) in model.atomics.iter().enumerate() {
            let Some(frame) = atomic.frame_index().filter(|&f| f < frame_count) else {
                self.report.push(Diagnostic::AtomicFrameOutOfRange {
                    atomic: index,
                    frame: atomic.frame,
                    count: frame_count,
                });
                continue;
            };
            let Some(geometry) = atomic.geometry_index().filter(|&g| g < geometry_count) else {
                self.report.push(Diagnostic::AtomicGeometryOutOfRange {
                    atomic: index,
                    geometry: atomic.geometry,
                    count: geometry_count,
                });
                continue;
            };

            if let Some((previous, _)) = self.atomics_by_frame.insert(frame, (index, geometry)) {
                self.report.push(Diagnostic::DuplicateAtomic {
                    atomic: index,
                    previous,
                    frame,
                });
            }
        }
    }
}

/// Builds host scenes from DFF files
#[derive(Debug, Clone)]
pub struct DffImporter<L: TextureLoader = FsTextureLoader> {
    options: ImportOptions,
    loader: L,
    parser: DffParser,
}

impl DffImporter<FsTextureLoader> {
    /// Importer reading textures from disk
    pub fn new(options: ImportOptions) -> Self {
        Self::with_loader(options, FsTextureLoader::new())
    }
}

impl Default for DffImporter<FsTextureLoader> {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

impl<L: TextureLoader> DffImporter<L> {
    pub fn with_loader(options: ImportOptions, loader: L) -> Self {
        Self {
            options,
            loader,
            parser: DffParser::new(),
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Decode `path` and build it into `sink`.
    ///
    /// Textures are looked up next to the file. Decode errors abort before
    /// the sink sees anything.
    pub fn import_file<S: SceneSink + ?Sized>(&self, path: &Path, sink: &mut S) -> Result<ImportReport> {
        self.options.validate()?;
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let model = self
            .parser
            .parse_file_with_options(path, &self.options.parse, None)
            .map_err(Error::from)
            .with_context(|| format!("decoding {}", path.display()))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(self.import_model(&model, dir, sink))
    }

    /// Decode an in-memory stream and build it into `sink`
    pub fn import_bytes<S: SceneSink + ?Sized>(
        &self,
        data: &[u8],
        texture_dir: &Path,
        sink: &mut S,
    ) -> Result<ImportReport> {
        self.options.validate()?;
        let model = self.parser.parse_bytes(data, &self.options.parse, None)?;
        Ok(self.import_model(&model, texture_dir, sink))
    }

    /// Build an already decoded model into `sink`
    pub fn import_model<S: SceneSink + ?Sized>(
        &self,
        model: &DffModel,
        texture_dir: &Path,
        sink: &mut S,
    ) -> ImportReport {
        let mut state = ImportState::new(model);
        state.bind_atomics(model);

        let resolver = MaterialResolver::new(&self.loader, texture_dir, &self.options.texture_extension);
        let builder = MeshBuilder::new(self.options.import_normals);

        let bindings: Vec<(usize, usize)> = state
            .atomics_by_frame
            .iter()
            .map(|(&frame, &(_, geometry))| (frame, geometry))
            .collect();

        for (frame_index, geometry_index) in bindings {
            let (Some(frame), Some(geometry)) =
                (model.frames.get(frame_index), model.geometries.get(geometry_index))
            else {
                continue;
            };
            let Some(name) = frame.name.as_deref() else {
                state.report.push(Diagnostic::UnnamedFrameMesh { frame: frame_index });
                continue;
            };

            let slots = match state.materials_by_geometry.get(&geometry_index) {
                Some(slots) => slots.clone(),
                None => {
                    let mut slots = Vec::with_capacity(geometry.materials.len());
                    for (i, material) in geometry.materials.iter().enumerate() {
                        let resolved = resolver.resolve(
                            material,
                            geometry.surface_properties.as_ref(),
                            format!("geometry{geometry_index}_material{i}"),
                        );
                        if let Some(diagnostic) = resolved.diagnostic {
                            state.report.push(diagnostic);
                        }
                        slots.push(sink.add_material(resolved.desc));
                        state.report.materials += 1;
                    }
                    state.materials_by_geometry.insert(geometry_index, slots.clone());
                    slots
                }
            };

            let mut build = builder.build(geometry, geometry_index, name);
            build.mesh.material_slots = slots;
            for diagnostic in build.diagnostics {
                state.report.push(diagnostic);
            }
            state.report.faces += build.mesh.faces.len();
            state.report.meshes += 1;

            let handle = sink.add_mesh(build.mesh);
            state.meshes_by_frame.insert(frame_index, handle);
        }

        hierarchy::build_nodes(model, &mut state, sink, self.options.empty_marker);

        tracing::info!(
            nodes = state.report.nodes,
            meshes = state.report.meshes,
            materials = state.report.materials,
            faces = state.report.faces,
            diagnostics = state.report.diagnostics.len(),
            "import complete"
        );

        state.report
    }
}
