//! Ternary tree construction.
//!
//! Each node splits its items into three regions around a plane chosen by
//! the surface area heuristic: items entirely below, items entirely above,
//! and items straddling the plane. The straddling region can hold as many
//! items as its parent, so the middle child remembers which axes already
//! produced it; once all three have, the node is forced into a leaf.

use std::ops::Range;

use tern_core::Primitive;
use tern_math::Aabb;

use crate::arena::{Node, NodeArena, NodeId, NodeKind};
use crate::config::AccelConfig;
use crate::extract::group_by_mesh;
use crate::instance::Instance;
use crate::sah::best_split;
use crate::triangles::TriangleStore;

const ALL_AXES: u8 = 0b111;

/// Everything the traversal needs, produced once by [`build`].
#[derive(Debug, Default)]
pub(crate) struct BuiltTree {
    pub triangles: TriangleStore,
    pub instances: Vec<Instance>,
    pub arena: NodeArena,
    pub root: Option<NodeId>,
}

/// Extract the primitives' geometry and build the tree over it.
///
/// Meshes placed more than once get a private subtree over their mesh-space
/// triangles plus one instance per placement. Meshes placed once are moved
/// into world space and go into the main tree directly.
pub(crate) fn build(primitives: &[Primitive], config: &AccelConfig) -> BuiltTree {
    let groups = group_by_mesh(primitives);
    let capacity = groups.iter().map(|group| group.mesh.triangle_count()).sum();
    let mut builder = TreeBuilder::new(config, capacity);

    for group in groups.iter().filter(|group| group.is_shared()) {
        let begin = builder.triangles.len();
        builder.push_triangles(|store| store.push_local(&group.mesh));
        let range = begin..builder.triangles.len();
        let triangle_count = range.len() as u32;

        let Some(root) = builder.build_subtree(range, 0..0) else {
            continue;
        };
        let local_bbox = builder.arena[root].bbox;

        log::debug!(
            "Shared {}: {} triangles, {} placements",
            group.id,
            triangle_count,
            group.primitives.len()
        );

        for &primitive in &group.primitives {
            let to_world = primitives[primitive as usize].mesh_to_world;
            builder
                .instances
                .push(Instance::new(root, primitive, to_world, &local_bbox, triangle_count));
        }
    }

    let begin = builder.triangles.len();
    for group in groups.iter().filter(|group| !group.is_shared()) {
        let primitive = group.primitives[0];
        let mesh_to_world = primitives[primitive as usize].mesh_to_world;
        builder.push_triangles(|store| store.push_world(&group.mesh, &mesh_to_world, primitive));
    }

    let triangles = begin..builder.triangles.len();
    let instances = 0..builder.instances.len();
    let root = builder.build_subtree(triangles, instances);

    builder.finish(root)
}

/// A node still to be created.
struct BuildTask {
    /// Parent node and child slot to link the new node into
    parent: Option<(NodeId, usize)>,
    triangles: Range<usize>,
    instances: Range<usize>,
    middle_mask: u8,
    depth: usize,
}

struct TreeBuilder<'a> {
    config: &'a AccelConfig,
    triangles: TriangleStore,
    /// Per-triangle boxes, kept parallel to `triangles` until the build ends
    triangle_boxes: Vec<Aabb>,
    instances: Vec<Instance>,
    arena: NodeArena,
    depth_limited_leaves: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(config: &'a AccelConfig, triangle_capacity: usize) -> Self {
        Self {
            config,
            triangles: TriangleStore::with_capacity(triangle_capacity),
            triangle_boxes: Vec::with_capacity(triangle_capacity),
            instances: Vec::new(),
            arena: NodeArena::with_capacity(triangle_capacity / config.leaf_threshold + 1),
            depth_limited_leaves: 0,
        }
    }

    /// Append triangles and their cached boxes.
    fn push_triangles(&mut self, append: impl FnOnce(&mut TriangleStore)) {
        let begin = self.triangles.len();
        append(&mut self.triangles);
        let end = self.triangles.len();
        self.triangle_boxes.extend((begin..end).map(|i| self.triangles.bbox(i)));
    }

    /// Build a tree over the given ranges, reordering the items in place.
    fn build_subtree(&mut self, triangles: Range<usize>, instances: Range<usize>) -> Option<NodeId> {
        if triangles.is_empty() && instances.is_empty() {
            return None;
        }

        let mut root = None;
        let mut tasks = vec![BuildTask {
            parent: None,
            triangles,
            instances,
            middle_mask: 0,
            depth: 0,
        }];

        while let Some(task) = tasks.pop() {
            let id = self.build_node(task, &mut tasks);
            root.get_or_insert(id);
        }

        root
    }

    /// Create the node for `task`, queueing tasks for its children.
    fn build_node(&mut self, task: BuildTask, tasks: &mut Vec<BuildTask>) -> NodeId {
        let BuildTask {
            parent,
            triangles,
            instances,
            middle_mask,
            depth,
        } = task;

        let bbox = self.bounds(&triangles, &instances);
        let items = triangles.len() + instances.len();

        let split = if items <= self.config.leaf_threshold || middle_mask == ALL_AXES {
            None
        } else if depth >= self.config.max_depth {
            log::debug!("Depth limit {} reached with {} items", self.config.max_depth, items);
            self.depth_limited_leaves += 1;
            None
        } else {
            best_split(
                &bbox,
                &self.triangle_boxes[triangles.clone()],
                &self.instances[instances.clone()],
                middle_mask,
                self.config,
            )
        };

        let id = match split {
            None => self.arena.push(Node {
                bbox,
                kind: NodeKind::Leaf {
                    triangles: triangles.start as u32..triangles.end as u32,
                    instances: instances.start as u32..instances.end as u32,
                },
            }),
            Some(split) => {
                let id = self.arena.push(Node {
                    bbox,
                    kind: NodeKind::Internal {
                        axis: split.axis as u8,
                        children: [None; 3],
                    },
                });

                let [tri_left, tri_middle, tri_right] =
                    self.partition_triangles(triangles, split.axis, split.position);
                let [inst_left, inst_middle, inst_right] =
                    self.partition_instances(instances, split.axis, split.position);

                let children = [
                    (tri_left, inst_left, middle_mask),
                    (tri_middle, inst_middle, middle_mask | (1 << split.axis)),
                    (tri_right, inst_right, middle_mask),
                ];

                // Reversed so the left child is built first.
                for (slot, (triangles, instances, middle_mask)) in children.into_iter().enumerate().rev() {
                    if triangles.is_empty() && instances.is_empty() {
                        continue;
                    }
                    tasks.push(BuildTask {
                        parent: Some((id, slot)),
                        triangles,
                        instances,
                        middle_mask,
                        depth: depth + 1,
                    });
                }

                id
            }
        };

        if let Some((parent, slot)) = parent {
            if let NodeKind::Internal { children, .. } = &mut self.arena.get_mut(parent).kind {
                children[slot] = Some(id);
            }
        }

        id
    }

    fn bounds(&self, triangles: &Range<usize>, instances: &Range<usize>) -> Aabb {
        let triangle_bounds = self.triangle_boxes[triangles.clone()]
            .iter()
            .fold(Aabb::EMPTY, |acc, bbox| Aabb::surrounding(&acc, bbox));

        self.instances[instances.clone()]
            .iter()
            .fold(triangle_bounds, |acc, instance| Aabb::surrounding(&acc, &instance.world_bbox))
    }

    /// Three-way partition of a triangle range around `position` on `axis`.
    fn partition_triangles(&mut self, range: Range<usize>, axis: usize, position: f64) -> [Range<usize>; 3] {
        let mut arrays = (&mut self.triangle_boxes, &mut self.triangles);
        partition(
            &mut arrays,
            range,
            |(boxes, _), i| classify(&boxes[i], axis, position),
            |(boxes, store), a, b| {
                boxes.swap(a, b);
                store.swap(a, b);
            },
        )
    }

    fn partition_instances(&mut self, range: Range<usize>, axis: usize, position: f64) -> [Range<usize>; 3] {
        partition(
            &mut self.instances,
            range,
            |instances, i| classify(&instances[i].world_bbox, axis, position),
            |instances, a, b| instances.swap(a, b),
        )
    }

    fn finish(mut self, root: Option<NodeId>) -> BuiltTree {
        if self.depth_limited_leaves > 0 {
            log::debug!(
                "{} leaves were forced by the depth limit of {}",
                self.depth_limited_leaves,
                self.config.max_depth
            );
        }

        self.triangles.shrink_to_fit();
        self.arena.shrink_to_fit();

        BuiltTree {
            triangles: self.triangles,
            instances: self.instances,
            arena: self.arena,
            root,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Middle,
    Right,
}

#[inline]
fn classify(bbox: &Aabb, axis: usize, position: f64) -> Side {
    let span = bbox.axis_interval(axis);
    if (span.max as f64) < position {
        Side::Left
    } else if (span.min as f64) > position {
        Side::Right
    } else {
        Side::Middle
    }
}

/// Single-pass Dutch flag partition of `range`.
///
/// Items below the plane are moved to the front, items above it to the back
/// and straddling items stay in between. `swap` must reorder every array
/// that `side` reads.
fn partition<S>(
    items: &mut S,
    range: Range<usize>,
    side: impl Fn(&S, usize) -> Side,
    swap: impl Fn(&mut S, usize, usize),
) -> [Range<usize>; 3] {
    let Range { start, end } = range;
    let mut middle_begin = start;
    let mut right_begin = end;
    let mut i = start;

    while i < right_begin {
        match side(items, i) {
            Side::Left => {
                swap(items, middle_begin, i);
                middle_begin += 1;
                i += 1;
            }
            Side::Right => {
                right_begin -= 1;
                swap(items, i, right_begin);
            }
            Side::Middle => i += 1,
        }
    }

    [start..middle_begin, middle_begin..right_begin, right_begin..end]
}
