use std::f32::consts::FRAC_PI_2;

use crate::config::HingeConfig;
use crate::scene::{NodeId, SceneGraph};

pub const INNER_DISPLAY: &str = "laptop_inner_display";
pub const OUTER_DISPLAY: &str = "laptop_outer_display";
pub const SCREEN: &str = "laptop_screen";

/// Lid angle change per rendered frame
pub const HINGE_STEP: f32 = 0.005;
/// Lowest lid angle, just short of a right angle
pub const HINGE_FLOOR: f32 = -FRAC_PI_2 + 0.05;

/// Which linked part a node name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HingePart {
    InnerDisplay,
    OuterDisplay,
    Screen,
}

impl HingePart {
    /// Exact, case-sensitive match against the asset's node names
    pub fn from_node_name(name: &str) -> Option<Self> {
        match name {
            INNER_DISPLAY => Some(HingePart::InnerDisplay),
            OUTER_DISPLAY => Some(HingePart::OuterDisplay),
            SCREEN => Some(HingePart::Screen),
            _ => None,
        }
    }
}

/// Animation state for the laptop lid.
///
/// The inner display drives the hinge; the outer display and screen copy its
/// x rotation after every step. Handles are non-owning and may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct HingeLinkage {
    pub inner_display: Option<NodeId>,
    pub outer_display: Option<NodeId>,
    pub screen: Option<NodeId>,
    step: f32,
    floor: f32,
}

impl Default for HingeLinkage {
    fn default() -> Self {
        Self {
            inner_display: None,
            outer_display: None,
            screen: None,
            step: HINGE_STEP,
            floor: HINGE_FLOOR,
        }
    }
}

impl HingeLinkage {
    pub fn new(config: &HingeConfig) -> Self {
        Self {
            step: config.step,
            floor: -FRAC_PI_2 + config.floor_margin,
            ..Self::default()
        }
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Records `id` for `part`, replacing any earlier match
    pub fn register(&mut self, part: HingePart, id: NodeId) {
        let slot = match part {
            HingePart::InnerDisplay => &mut self.inner_display,
            HingePart::OuterDisplay => &mut self.outer_display,
            HingePart::Screen => &mut self.screen,
        };
        *slot = Some(id);
    }

    pub fn clear(&mut self) {
        self.inner_display = None;
        self.outer_display = None;
        self.screen = None;
    }

    pub fn is_empty(&self) -> bool {
        self.inner_display.is_none() && self.outer_display.is_none() && self.screen.is_none()
    }

    /// Advances the hinge by one frame and propagates the angle.
    /// Returns the driver angle, or `None` when there is no inner display.
    pub fn step(&self, scene: &mut SceneGraph) -> Option<f32> {
        let inner = scene.get_mut(self.inner_display?)?;
        let angle = &mut inner.transform.rotation.x;
        if *angle > self.floor {
            *angle = (*angle - self.step).max(self.floor);
        }
        let angle = *angle;

        for follower in [self.outer_display, self.screen].into_iter().flatten() {
            if let Some(node) = scene.get_mut(follower) {
                node.transform.rotation.x = angle;
            }
        }
        Some(angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Node;

    fn rig() -> (SceneGraph, HingeLinkage) {
        let mut scene = SceneGraph::new("scene");
        let root = scene.root();
        let mut linkage = HingeLinkage::default();
        for name in [INNER_DISPLAY, OUTER_DISPLAY, SCREEN] {
            let id = scene.add(root, Node::group(name)).unwrap();
            linkage.register(HingePart::from_node_name(name).unwrap(), id);
        }
        (scene, linkage)
    }

    fn angle(scene: &SceneGraph, id: Option<NodeId>) -> f32 {
        scene.get(id.unwrap()).unwrap().transform.rotation.x
    }

    #[test]
    fn test_part_names_are_case_sensitive() {
        assert_eq!(HingePart::from_node_name("laptop_screen"), Some(HingePart::Screen));
        assert_eq!(HingePart::from_node_name("Laptop_Screen"), None);
        assert_eq!(HingePart::from_node_name("laptop_screen "), None);
    }

    #[test]
    fn test_single_step() {
        let (mut scene, linkage) = rig();
        assert_eq!(linkage.step(&mut scene), Some(-0.005));
        assert_eq!(angle(&scene, linkage.outer_display), -0.005);
        assert_eq!(angle(&scene, linkage.screen), -0.005);
    }

    #[test]
    fn test_hundred_steps() {
        let (mut scene, linkage) = rig();
        for _ in 0..100 {
            linkage.step(&mut scene);
        }
        assert!((angle(&scene, linkage.inner_display) + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_stops_at_floor() {
        let (mut scene, linkage) = rig();
        for _ in 0..1000 {
            linkage.step(&mut scene);
        }
        let settled = angle(&scene, linkage.inner_display);
        assert_eq!(settled, HINGE_FLOOR);

        linkage.step(&mut scene);
        assert_eq!(angle(&scene, linkage.inner_display), settled);
        assert_eq!(angle(&scene, linkage.screen), settled);
    }

    #[test]
    fn test_missing_driver_is_noop() {
        let (mut scene, mut linkage) = rig();
        linkage.inner_display = None;
        assert_eq!(linkage.step(&mut scene), None);
        assert_eq!(angle(&scene, linkage.screen), 0.0);
    }

    #[test]
    fn test_missing_followers_are_skipped() {
        let (mut scene, mut linkage) = rig();
        linkage.screen = None;
        linkage.outer_display = None;
        assert_eq!(linkage.step(&mut scene), Some(-0.005));
    }

    #[test]
    fn test_register_replaces_previous() {
        let (mut scene, mut linkage) = rig();
        let newer = scene.add(scene.root(), Node::group(SCREEN)).unwrap();
        linkage.register(HingePart::Screen, newer);
        assert_eq!(linkage.screen, Some(newer));

        linkage.clear();
        assert!(linkage.is_empty());
    }
}
