use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use super::graph::SceneGraph;
use super::node::{Geometry, Light, Material, Mesh, Node, NodeKind, ShadowSettings};
use crate::camera::{PerspectiveCamera, DEFAULT_FAR, DEFAULT_FOV_DEGREES, DEFAULT_NEAR};
use crate::config::ViewerConfig;
use crate::math::{hex_to_rgb, srgb_to_linear, Transform};
use crate::traits::{RendererSettings, ShadowFiltering, Viewport};

pub const AMBIENT_LIGHT_NAME: &str = "ambient_light";
pub const DIRECTIONAL_LIGHT_NAME: &str = "directional_light";
pub const GROUND_NAME: &str = "ground";

const AMBIENT_INTENSITY: f32 = 0.5;
const DIRECTIONAL_INTENSITY: f32 = 1.0;
const DIRECTIONAL_POSITION: Vec3 = Vec3::new(5.0, 10.0, 7.5);
const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 50.0;
const SHADOW_EXTENT: f32 = 10.0;
const GROUND_SIZE: f32 = 20.0;
const GROUND_HEIGHT: f32 = -1.0;
const GROUND_COLOR: u32 = 0xcccccc;
const CAMERA_POSITION: Vec3 = Vec3::new(2.0, 2.0, 5.0);

/// Everything constructed once when a session mounts
#[derive(Debug, Clone)]
pub struct SceneSetup {
    pub scene: SceneGraph,
    pub camera: PerspectiveCamera,
    pub renderer: RendererSettings,
}

/// Builds the static stage: background, lights, ground plane and camera
pub fn build_scene(viewport: Viewport, config: &ViewerConfig) -> SceneSetup {
    let mut scene = SceneGraph::new("scene").with_background(hex_to_rgb(config.background));
    let root = scene.root();

    let white = [1.0, 1.0, 1.0];
    scene.add(
        root,
        Node::new(AMBIENT_LIGHT_NAME, NodeKind::Light(Light::ambient(white, AMBIENT_INTENSITY))),
    );

    let shadow = ShadowSettings {
        map_size: config.shadow_map_size,
        near: SHADOW_NEAR,
        far: SHADOW_FAR,
        extent: SHADOW_EXTENT,
    };
    scene.add(
        root,
        Node::new(
            DIRECTIONAL_LIGHT_NAME,
            NodeKind::Light(Light::directional(white, DIRECTIONAL_INTENSITY, Some(shadow))),
        )
        .with_transform(Transform::from_position(DIRECTIONAL_POSITION)),
    );

    let mut ground = Mesh::new(
        Geometry::plane(GROUND_SIZE, GROUND_SIZE),
        Material::new(srgb_to_linear(hex_to_rgb(GROUND_COLOR))).named("ground"),
    );
    ground.receive_shadow = true;
    scene.add(
        root,
        Node::new(GROUND_NAME, NodeKind::Mesh(ground)).with_transform(
            Transform::from_position(Vec3::new(0.0, GROUND_HEIGHT, 0.0))
                .with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
        ),
    );

    let aspect = viewport.aspect().unwrap_or(1.0);
    let camera = PerspectiveCamera::new(DEFAULT_FOV_DEGREES, aspect, DEFAULT_NEAR, DEFAULT_FAR)
        .with_position(CAMERA_POSITION)
        .look_at(Vec3::ZERO);

    log::debug!(
        "Scene built: {} nodes, viewport {}x{} @{:.2}",
        scene.len(),
        viewport.width,
        viewport.height,
        viewport.pixel_ratio
    );

    SceneSetup {
        scene,
        camera,
        renderer: RendererSettings {
            viewport,
            shadows: Some(ShadowFiltering::SoftPcf),
            shadow_map_size: config.shadow_map_size,
        },
    }
}
