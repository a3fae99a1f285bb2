mod builder;
mod graph;
mod node;

pub use builder::{build_scene, SceneSetup, AMBIENT_LIGHT_NAME, DIRECTIONAL_LIGHT_NAME, GROUND_NAME};
pub use graph::{NodeId, SceneGraph};
pub use node::{
    CameraNode, Geometry, GeometryGroup, GeometryId, Light, LightKind, Material, MaterialId,
    MaterialSlot, Mesh, Node, NodeKind, ShadowSettings,
};
