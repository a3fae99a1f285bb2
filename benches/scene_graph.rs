use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use laptop_viewer::animation::{HingeLinkage, HingePart, INNER_DISPLAY, OUTER_DISPLAY, SCREEN};
use laptop_viewer::math::Transform;
use laptop_viewer::scene::{Geometry, Material, Mesh, Node, NodeId, NodeKind, SceneGraph};

/// Builds a tree with `breadth` children per level, `depth` levels deep
fn build_tree(breadth: usize, depth: usize) -> SceneGraph {
    let mut graph = SceneGraph::new("root");
    let mut level = vec![graph.root()];

    for d in 0..depth {
        let mut next = Vec::with_capacity(level.len() * breadth);
        for &parent in &level {
            for i in 0..breadth {
                let transform = Transform::from_position(Vec3::new(i as f32, d as f32, 0.0))
                    .with_rotation(Vec3::new(0.1 * i as f32, 0.0, 0.0));
                let node = if d + 1 == depth {
                    let mesh = Mesh::new(Geometry::plane(1.0, 1.0), Material::new([1.0; 3]));
                    Node::new(format!("leaf_{}_{}", d, i), NodeKind::Mesh(mesh))
                } else {
                    Node::group(format!("group_{}_{}", d, i))
                };
                if let Some(id) = graph.add(parent, node.with_transform(transform)) {
                    next.push(id);
                }
            }
        }
        level = next;
    }
    graph
}

fn rigged_laptop() -> (SceneGraph, HingeLinkage) {
    let mut graph = build_tree(4, 3);
    let root = graph.root();
    let mut linkage = HingeLinkage::default();
    for name in [INNER_DISPLAY, OUTER_DISPLAY, SCREEN] {
        let id: NodeId = graph.add(root, Node::group(name)).unwrap();
        linkage.register(HingePart::from_node_name(name).unwrap(), id);
    }
    (graph, linkage)
}

fn bench_world_matrices(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_matrices");
    for breadth in [2, 4, 8] {
        let graph = build_tree(breadth, 4);
        group.bench_with_input(BenchmarkId::from_parameter(graph.len()), &graph, |b, graph| {
            b.iter(|| black_box(graph.world_matrices()))
        });
    }
    group.finish();
}

fn bench_find_by_name(c: &mut Criterion) {
    let graph = build_tree(8, 4);
    c.bench_function("find_by_name", |b| {
        b.iter(|| black_box(graph.find_by_name(black_box("leaf_3_7"))))
    });
}

fn bench_hinge_step(c: &mut Criterion) {
    c.bench_function("hinge_step", |b| {
        b.iter_batched(
            rigged_laptop,
            |(mut graph, linkage)| {
                for _ in 0..100 {
                    black_box(linkage.step(&mut graph));
                }
                graph
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_world_matrices, bench_find_by_name, bench_hinge_step);
criterion_main!(benches);
