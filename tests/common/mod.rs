#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use laptop_viewer::camera::PerspectiveCamera;
use laptop_viewer::error::{RenderError, ViewerError};
use laptop_viewer::scene::{GeometryId, MaterialId, SceneGraph};
use laptop_viewer::traits::{FrameHandle, FrameScheduler, RenderBackend, RendererSettings, Viewport};
use laptop_viewer::{Session, ViewerConfig};

/// Ordered record of every backend and scheduler call a session made
#[derive(Debug, Default)]
pub struct CallLog {
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    RequestFrame(FrameHandle),
    CancelFrame(FrameHandle),
    Resize(Viewport),
    Render { camera_aspect: f32, size: (u32, u32) },
    ReleaseGeometry(GeometryId),
    ReleaseMaterial(MaterialId),
    Dispose,
}

pub type SharedLog = Rc<RefCell<CallLog>>;

impl CallLog {
    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| matches(c)).count()
    }

    pub fn renders(&self) -> usize {
        self.count(|c| matches!(c, Call::Render { .. }))
    }

    pub fn position(&self, matches: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(matches)
    }
}

pub struct MockBackend {
    log: SharedLog,
    size: (u32, u32),
    fail_with: Option<fn() -> RenderError>,
}

impl RenderBackend for MockBackend {
    fn resize(&mut self, viewport: Viewport) {
        self.size = (viewport.width, viewport.height);
        self.log.borrow_mut().calls.push(Call::Resize(viewport));
    }

    fn render(&mut self, _scene: &SceneGraph, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        self.log.borrow_mut().calls.push(Call::Render {
            camera_aspect: camera.aspect,
            size: self.size,
        });
        match self.fail_with {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }

    fn release_geometry(&mut self, id: GeometryId) {
        self.log.borrow_mut().calls.push(Call::ReleaseGeometry(id));
    }

    fn release_material(&mut self, id: MaterialId) {
        self.log.borrow_mut().calls.push(Call::ReleaseMaterial(id));
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().calls.push(Call::Dispose);
    }
}

/// Hands out frame handles and keeps at most one pending, like a display
/// refresh callback would
pub struct MockScheduler {
    log: SharedLog,
    next: u64,
    pending: Option<FrameHandle>,
}

impl MockScheduler {
    pub fn new(log: SharedLog) -> Self {
        Self {
            log,
            next: 0,
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }
}

impl FrameScheduler for MockScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending = Some(handle);
        self.log.borrow_mut().calls.push(Call::RequestFrame(handle));
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
        self.log.borrow_mut().calls.push(Call::CancelFrame(handle));
    }

    fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

pub type MockSession = Session<MockBackend, MockScheduler>;

pub fn mount_at(viewport: Viewport) -> (MockSession, SharedLog) {
    mount_with(viewport, None)
}

/// Mounts a session whose every draw fails with `fail_with()`
pub fn mount_failing(fail_with: fn() -> RenderError) -> (MockSession, SharedLog) {
    mount_with(Viewport::new(800, 600, 1.0), Some(fail_with))
}

fn mount_with(viewport: Viewport, fail_with: Option<fn() -> RenderError>) -> (MockSession, SharedLog) {
    let log: SharedLog = Rc::default();
    let backend_log = log.clone();
    let session = Session::mount(
        Some(viewport),
        ViewerConfig::default(),
        MockScheduler::new(log.clone()),
        move |settings: &RendererSettings| {
            Ok::<_, ViewerError>(MockBackend {
                log: backend_log,
                size: (settings.viewport.width, settings.viewport.height),
                fail_with,
            })
        },
    )
    .unwrap();
    (session, log)
}

pub fn mount() -> (MockSession, SharedLog) {
    mount_at(Viewport::new(800, 600, 1.0))
}

const POSITION_BYTES: usize = 36;
const INDEX_BYTES: usize = 6;

/// Builds a GLB with one triangle shared by every primitive.
///
/// Layout: node "laptop" holding `laptop_inner_display` and
/// `laptop_outer_display` (both instancing mesh 0) and `laptop_screen`
/// (mesh 1, two primitives with different materials).
pub fn laptop_glb() -> Vec<u8> {
    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "laptop", "children": [1, 2, 3] },
            { "name": "laptop_inner_display", "mesh": 0, "rotation": [0.0, 0.0, 0.0, 1.0] },
            { "name": "laptop_outer_display", "mesh": 0, "translation": [0.0, 0.1, 0.0] },
            { "name": "laptop_screen", "mesh": 1 }
        ],
        "meshes": [
            { "name": "lid", "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }] },
            { "name": "panel", "primitives": [
                { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 },
                { "attributes": { "POSITION": 0 }, "indices": 1, "material": 1 }
            ] }
        ],
        "materials": [
            { "name": "aluminium", "pbrMetallicRoughness": { "baseColorFactor": [0.8, 0.8, 0.8, 1.0] } },
            { "name": "glass", "pbrMetallicRoughness": { "baseColorFactor": [0.1, 0.1, 0.1, 1.0] } }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": POSITION_BYTES, "target": 34962 },
            { "buffer": 0, "byteOffset": POSITION_BYTES, "byteLength": INDEX_BYTES, "target": 34963 }
        ],
        "buffers": [{ "byteLength": POSITION_BYTES + INDEX_BYTES }]
    });

    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }

    glb(&document.to_string(), bin)
}

/// Wraps a JSON document and binary chunk in a GLB container
pub fn glb(json: &str, mut bin: Vec<u8>) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);

    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

/// Writes `bytes` to a fresh file under the system temp dir
pub fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "laptop-viewer-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// One triangle mesh instanced by a root node per entry of `node_names`
pub fn triangle_glb(node_names: &[&str], mode: u32, indices: [u16; 3]) -> Vec<u8> {
    let nodes: Vec<_> = node_names
        .iter()
        .map(|name| json!({ "name": name, "mesh": 0 }))
        .collect();
    let roots: Vec<usize> = (0..node_names.len()).collect();

    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": roots }],
        "nodes": nodes,
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "mode": mode }] }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": POSITION_BYTES },
            { "buffer": 0, "byteOffset": POSITION_BYTES, "byteLength": INDEX_BYTES }
        ],
        "buffers": [{ "byteLength": POSITION_BYTES + INDEX_BYTES }]
    });

    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in indices {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    glb(&document.to_string(), bin)
}
