use super::gltf::LoadedModel;
use crate::animation::{HingeLinkage, HingePart};
use crate::scene::{NodeId, NodeKind, SceneGraph};

/// What happened when a model joined the live scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachReport {
    pub root: NodeId,
    pub meshes: usize,
    pub hinge_parts: usize,
}

/// Grafts a loaded model under the scene root, turns on shadows for all of
/// its meshes and records the hinge parts it names in `linkage`.
pub fn attach_model(
    scene: &mut SceneGraph,
    model: LoadedModel,
    linkage: &mut HingeLinkage,
) -> Option<AttachReport> {
    let root = scene.graft(scene.root(), model.graph)?;
    let mut meshes = 0;
    let mut hinge_parts = 0;

    scene.traverse_mut(root, |id, node| {
        match &mut node.kind {
            NodeKind::Mesh(mesh) => {
                mesh.cast_shadow = true;
                mesh.receive_shadow = true;
                meshes += 1;
            }
            NodeKind::Group | NodeKind::Light(_) | NodeKind::Camera(_) => {}
        }

        if let Some(part) = HingePart::from_node_name(&node.name) {
            linkage.register(part, id);
            hinge_parts += 1;
        }
    });

    Some(AttachReport {
        root,
        meshes,
        hinge_parts,
    })
}
