use glam::Mat4;

use super::node::{Light, Mesh, Node, NodeKind};

/// Non-owning handle to a node inside a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena-backed node hierarchy.
///
/// Nodes are only ever appended, and a node is always stored after its
/// parent, so a single forward pass over the arena visits parents first.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub background: [f32; 3],
    nodes: Vec<Node>,
}

impl SceneGraph {
    /// Creates a graph holding only an empty root group
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            background: [0.0, 0.0, 0.0],
            nodes: vec![Node::group(root_name)],
        }
    }

    pub fn with_background(mut self, background: [f32; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root is always present
        false
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Appends `node` as the last child of `parent`.
    /// Returns `None` if `parent` does not belong to this graph.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    /// Moves every node of `other` under `parent`, returning the new id of
    /// `other`'s root. Ids from `other` are invalid afterwards.
    pub fn graft(&mut self, parent: NodeId, other: SceneGraph) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);

        for (index, mut node) in other.nodes.into_iter().enumerate() {
            node.parent = if index == 0 { Some(parent) } else { node.parent.map(shift) };
            node.children = node.children.into_iter().map(shift).collect();
            self.nodes.push(node);
        }

        let grafted = NodeId(offset);
        self.nodes[parent.0].children.push(grafted);
        Some(grafted)
    }

    /// Depth-first, pre-order ids of `start` and all of its descendants
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut visited = Vec::new();
        if start.0 >= self.nodes.len() {
            return visited;
        }

        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            visited.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        visited
    }

    pub fn traverse(&self, start: NodeId, mut visit: impl FnMut(NodeId, &Node)) {
        for id in self.descendants(start) {
            visit(id, &self.nodes[id.0]);
        }
    }

    pub fn traverse_mut(&mut self, start: NodeId, mut visit: impl FnMut(NodeId, &mut Node)) {
        for id in self.descendants(start) {
            visit(id, &mut self.nodes[id.0]);
        }
    }

    /// Last node in traversal order whose name matches exactly
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.nodes[id.0].name == name)
            .last()
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.get(id)?;
        let mut matrix = node.transform.matrix();
        while let Some(parent) = node.parent {
            node = &self.nodes[parent.0];
            matrix = node.transform.matrix() * matrix;
        }
        Some(matrix)
    }

    /// World matrices for every node, indexed by [`NodeId::index`]
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut matrices: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.transform.matrix();
            let world = match node.parent {
                Some(parent) => matrices[parent.0] * local,
                None => local,
            };
            matrices.push(world);
        }
        matrices
    }

    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.as_mesh().map(|mesh| (NodeId(i), mesh)))
    }

    pub fn lights(&self) -> impl Iterator<Item = (NodeId, &Light)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.as_light().map(|light| (NodeId(i), light)))
    }

    /// Counts nodes per kind as (groups, meshes, lights, cameras)
    pub fn census(&self) -> (usize, usize, usize, usize) {
        self.nodes.iter().fold((0, 0, 0, 0), |(g, m, l, c), node| match node.kind {
            NodeKind::Group => (g + 1, m, l, c),
            NodeKind::Mesh(_) => (g, m + 1, l, c),
            NodeKind::Light(_) => (g, m, l + 1, c),
            NodeKind::Camera(_) => (g, m, l, c + 1),
        })
    }
}
