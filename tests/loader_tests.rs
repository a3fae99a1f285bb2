mod common;

use glam::Vec3;

use common::{laptop_glb, triangle_glb, write_temp};
use laptop_viewer::animation::{HingeLinkage, INNER_DISPLAY, OUTER_DISPLAY, SCREEN};
use laptop_viewer::config::ViewerConfig;
use laptop_viewer::loaders::{attach_model, load_asset, parse_asset, LoadProgress};
use laptop_viewer::scene::{build_scene, MaterialSlot, NodeKind};
use laptop_viewer::traits::Viewport;
use laptop_viewer::LoadError;

const TRIANGLES: u32 = 4;
const LINES: u32 = 1;

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_laptop_structure() {
        let model = parse_asset(&laptop_glb()).unwrap();
        let graph = &model.graph;

        assert_eq!(graph.census(), (2, 3, 0, 0));
        for name in [INNER_DISPLAY, OUTER_DISPLAY, SCREEN] {
            assert!(graph.find_by_name(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_instanced_mesh_shares_geometry_and_material() {
        let model = parse_asset(&laptop_glb()).unwrap();
        let graph = &model.graph;
        let mesh_of = |name| graph.get(graph.find_by_name(name).unwrap()).unwrap().as_mesh().unwrap();

        let inner = mesh_of(INNER_DISPLAY);
        let outer = mesh_of(OUTER_DISPLAY);
        let screen = mesh_of(SCREEN);
        assert_eq!(inner.geometry.id(), outer.geometry.id());
        assert_ne!(inner.geometry.id(), screen.geometry.id());

        let MaterialSlot::Multi(materials) = &screen.materials else {
            panic!("screen should carry one material per primitive");
        };
        assert_eq!(materials.len(), 2);
        assert_eq!(screen.geometry.groups.len(), 2);
        assert_eq!(screen.geometry.groups[1].start, 3);
        assert_eq!(screen.geometry.groups[1].material_index, 1);
        assert_eq!(materials[0].id(), inner.materials.as_slice()[0].id());
        assert_eq!(materials[1].name.as_deref(), Some("glass"));
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let model = parse_asset(&laptop_glb()).unwrap();
        let graph = &model.graph;
        let inner = graph.get(graph.find_by_name(INNER_DISPLAY).unwrap()).unwrap();
        let normals = &inner.as_mesh().unwrap().geometry.normals;

        assert_eq!(normals.len(), 3);
        for n in normals {
            assert!((Vec3::from_array(*n) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_bounds_include_node_transforms() {
        let bounds = parse_asset(&laptop_glb()).unwrap().bounds.unwrap();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert!((bounds.max - Vec3::new(1.0, 1.1, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_non_triangle_primitives_are_skipped() {
        let model = parse_asset(&triangle_glb(&["wire"], LINES, [0, 1, 2])).unwrap();
        let wire = model.graph.find_by_name("wire").unwrap();
        assert!(matches!(model.graph.get(wire).unwrap().kind, NodeKind::Group));
        assert!(model.bounds.is_none());
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let err = parse_asset(&triangle_glb(&["broken"], TRIANGLES, [0, 1, 7])).unwrap_err();
        assert!(matches!(err, LoadError::Geometry(_)));
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic_and_completes() {
        let path = write_temp("laptop.glb", &laptop_glb());
        let mut progress: Vec<LoadProgress> = Vec::new();

        let model = load_asset(&path, |p| progress.push(p)).unwrap();
        assert_eq!(model.graph.census().1, 3);

        assert!(!progress.is_empty());
        assert!(progress.windows(2).all(|w| w[0].loaded <= w[1].loaded));
        let last = progress.last().unwrap();
        assert_eq!(last.loaded, last.total);
        assert_eq!(last.fraction(), 1.0);
    }

    #[test]
    fn test_empty_file_reports_completion_then_fails_to_parse() {
        let path = write_temp("empty.glb", &[]);
        let mut progress = Vec::new();

        let err = load_asset(&path, |p| progress.push(p)).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
        assert_eq!(progress, vec![LoadProgress { loaded: 0, total: 0 }]);
    }
}

#[cfg(test)]
mod attach_tests {
    use super::*;

    fn stage() -> laptop_viewer::scene::SceneGraph {
        build_scene(Viewport::new(800, 600, 1.0), &ViewerConfig::default()).scene
    }

    #[test]
    fn test_attach_finds_all_hinge_parts_and_enables_shadows() {
        let mut scene = stage();
        let mut linkage = HingeLinkage::default();
        let report = attach_model(&mut scene, parse_asset(&laptop_glb()).unwrap(), &mut linkage).unwrap();

        assert_eq!(report.meshes, 3);
        assert_eq!(report.hinge_parts, 3);
        assert_eq!(scene.get(report.root).unwrap().parent(), Some(scene.root()));

        for id in [linkage.inner_display, linkage.outer_display, linkage.screen] {
            let node = scene.get(id.unwrap()).unwrap();
            let mesh = node.as_mesh().unwrap();
            assert!(mesh.cast_shadow && mesh.receive_shadow);
        }
        assert_eq!(scene.get(linkage.screen.unwrap()).unwrap().name, SCREEN);
    }

    #[test]
    fn test_duplicate_names_keep_last_match() {
        let mut scene = stage();
        let mut linkage = HingeLinkage::default();
        let model = parse_asset(&triangle_glb(&[INNER_DISPLAY, INNER_DISPLAY], TRIANGLES, [0, 1, 2])).unwrap();
        let report = attach_model(&mut scene, model, &mut linkage).unwrap();

        let matches: Vec<_> = scene
            .descendants(report.root)
            .into_iter()
            .filter(|&id| scene.get(id).unwrap().name == INNER_DISPLAY)
            .collect();
        assert_eq!(matches.len(), 2);
        assert_eq!(linkage.inner_display, matches.last().copied());
        assert!(linkage.outer_display.is_none());
        assert!(linkage.screen.is_none());
    }

    #[test]
    fn test_model_without_named_parts_leaves_linkage_empty() {
        let mut scene = stage();
        let mut linkage = HingeLinkage::default();
        let model = parse_asset(&triangle_glb(&["keyboard"], TRIANGLES, [0, 1, 2])).unwrap();
        attach_model(&mut scene, model, &mut linkage).unwrap();

        assert!(linkage.is_empty());
        assert_eq!(linkage.step(&mut scene), None);
    }
}
