//! Frame list → host nodes

use dffkit_parsers::DffModel;

use crate::config::EmptyMarker;
use crate::diagnostics::Diagnostic;
use crate::importer::ImportState;
use crate::sink::{NodeDesc, SceneSink};

/// Frame parent value for "no parent"
const NO_PARENT: i32 = -1;

/// Emit one node per named frame, in file order.
///
/// Meshes are looked up by frame index in `state`. Parents are resolved
/// through the frame-index table as it is filled, so a parent must come
/// before its children to be linked.
pub(crate) fn build_nodes<S: SceneSink + ?Sized>(
    model: &DffModel,
    state: &mut ImportState,
    sink: &mut S,
    marker: EmptyMarker,
) {
    for (index, frame) in model.frames.iter().enumerate() {
        let Some(name) = frame.name.as_deref() else {
            tracing::trace!(frame = index, "unnamed frame skipped");
            continue;
        };

        let mesh = state.meshes_by_frame.get(&index).copied();
        let node = sink.add_node(NodeDesc {
            name: name.to_string(),
            mesh,
            position: frame.position,
            rotation: frame.rotation.to_quaternion(),
        });
        state.nodes_by_frame[index] = Some(node);
        state.report.nodes += 1;

        if mesh.is_none() {
            sink.set_empty_marker(node, marker);
        }

        if frame.parent == NO_PARENT {
            continue;
        }
        let parent = usize::try_from(frame.parent)
            .ok()
            .and_then(|p| state.nodes_by_frame.get(p).copied().flatten());
        match parent {
            Some(parent) => sink.set_parent(node, parent),
            None => state.report.push(Diagnostic::DanglingParent {
                frame: index,
                name: name.to_string(),
                parent: frame.parent,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SceneCollector;
    use dffkit_core::{Mat3, Vec3};
    use dffkit_parsers::Frame;

    fn frame(name: Option<&str>, parent: i32) -> Frame {
        Frame {
            name: name.map(str::to_string),
            parent,
            ..Frame::default()
        }
    }

    fn run(frames: Vec<Frame>) -> (crate::sink::Scene, ImportState) {
        let model = DffModel {
            frames,
            ..DffModel::default()
        };
        let mut state = ImportState::new(&model);
        let mut sink = SceneCollector::new();
        build_nodes(&model, &mut state, &mut sink, EmptyMarker::default());
        (sink.into_scene(), state)
    }

    fn parent_name<'a>(scene: &'a crate::sink::Scene, name: &str) -> Option<&'a str> {
        let (_, node) = scene.find(name)?;
        node.parent.and_then(|p| scene.node(p)).map(|n| n.name.as_str())
    }

    #[test]
    fn test_siblings_share_parent_in_any_order() {
        let (scene, _) = run(vec![frame(Some("A"), -1), frame(Some("B"), 0), frame(Some("C"), 0)]);
        assert_eq!(parent_name(&scene, "B"), Some("A"));
        assert_eq!(parent_name(&scene, "C"), Some("A"));

        let (scene, _) = run(vec![frame(Some("A"), -1), frame(Some("C"), 0), frame(Some("B"), 0)]);
        assert_eq!(parent_name(&scene, "B"), Some("A"));
        assert_eq!(parent_name(&scene, "C"), Some("A"));
    }

    #[test]
    fn test_unnamed_frame_gets_no_node() {
        let (scene, state) = run(vec![frame(Some("root"), -1), frame(None, 0), frame(Some("leaf"), 0)]);
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(state.nodes_by_frame[1], None);
        assert_eq!(parent_name(&scene, "leaf"), Some("root"));
    }

    #[test]
    fn test_dangling_parents_reported() {
        // child of a skipped frame, forward reference, out of range
        let (scene, state) = run(vec![
            frame(None, -1),
            frame(Some("a"), 0),
            frame(Some("b"), 3),
            frame(Some("c"), 42),
            frame(Some("d"), -7),
        ]);
        assert_eq!(scene.roots().len(), 4);
        let parents: Vec<i32> = state
            .report
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::DanglingParent { parent, .. } => Some(*parent),
                _ => None,
            })
            .collect();
        assert_eq!(parents, vec![0, 3, 42, -7]);
    }

    #[test]
    fn test_transform_and_empty_marker() {
        let mut f = frame(Some("door"), -1);
        f.position = Vec3::new(1.0, 2.0, 3.0);
        f.rotation = Mat3::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), Vec3::Z);
        let (scene, _) = run(vec![f]);

        let node = &scene.nodes[0];
        assert_eq!(node.position, Vec3::new(1.0, 2.0, 3.0));
        let half = std::f32::consts::FRAC_1_SQRT_2;
        assert!((node.rotation.z.abs() - half).abs() < 1e-5);
        assert!((node.rotation.w.abs() - half).abs() < 1e-5);
        assert_eq!(node.empty_marker, Some(EmptyMarker::default()));
    }
}
