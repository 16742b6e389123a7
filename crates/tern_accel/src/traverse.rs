//! Nearest-hit and any-hit tree traversal.
//!
//! Both queries walk the arena with a fixed-size stack. Instances are entered
//! by moving the ray into the subtree's space and running the same walk on
//! the subtree; subtrees hold no instances, so this recursion is one level
//! deep.

use std::ops::Range;

use tern_math::{intersect_triangle, DVec3, Ray};

use crate::arena::{NodeId, NodeKind};
use crate::build::BuiltTree;
use crate::config::MAX_SUPPORTED_DEPTH;
use crate::triangles::SHARED_PRIMITIVE;

/// Pending nodes never exceed two per level plus the node being expanded.
const STACK_CAPACITY: usize = 2 * MAX_SUPPORTED_DEPTH + 1;

/// Nearest hit as stored in the tree: indices into the accelerator's
/// primitive list and the primitive's mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TreeHit {
    pub primitive: u32,
    pub triangle: u32,
    pub t: f64,
}

struct NodeStack {
    nodes: [NodeId; STACK_CAPACITY],
    len: usize,
}

impl NodeStack {
    #[inline]
    fn new(root: NodeId) -> Self {
        Self {
            nodes: [root; STACK_CAPACITY],
            len: 1,
        }
    }

    #[inline]
    fn pop(&mut self) -> Option<NodeId> {
        self.len = self.len.checked_sub(1)?;
        Some(self.nodes[self.len])
    }

    #[inline]
    fn push(&mut self, id: Option<NodeId>) {
        if let Some(id) = id {
            self.nodes[self.len] = id;
            self.len += 1;
        }
    }

    /// Push children so the one nearest along `direction` is popped first.
    #[inline]
    fn push_children(&mut self, children: &[Option<NodeId>; 3], direction: f64) {
        if direction > 0.0 {
            self.push(children[2]);
            self.push(children[1]);
            self.push(children[0]);
        } else {
            self.push(children[0]);
            self.push(children[1]);
            self.push(children[2]);
        }
    }
}

#[inline]
fn indices(range: &Range<u32>) -> Range<usize> {
    range.start as usize..range.end as usize
}

impl BuiltTree {
    /// Closest hit within the ray's `[min_t, max_t]`.
    pub(crate) fn nearest(&self, ray: &Ray) -> Option<TreeHit> {
        let root = self.root?;
        let mut ray = *ray;
        self.nearest_from(root, &mut ray)
    }

    /// Whether anything is hit within the ray's `[min_t, max_t]`.
    pub(crate) fn any(&self, ray: &Ray) -> bool {
        self.root.is_some_and(|root| self.any_from(root, ray))
    }

    /// Nearest hit below `root`. Shrinks `ray.max_t` to the hit distance.
    fn nearest_from(&self, root: NodeId, ray: &mut Ray) -> Option<TreeHit> {
        let inv_direction = ray.direction.recip();
        let mut stack = NodeStack::new(root);
        let mut hit = None;

        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            if !node.bbox.hit_slabs(ray.origin, inv_direction, ray.min_t, ray.max_t) {
                continue;
            }

            match &node.kind {
                NodeKind::Internal { axis, children } => {
                    stack.push_children(children, axis_component(ray.direction, *axis));
                }
                NodeKind::Leaf { triangles, instances } => {
                    for instance in &self.instances[indices(instances)] {
                        let mut local = instance.local_ray(ray);
                        if let Some(local_hit) = self.nearest_from(instance.root, &mut local) {
                            debug_assert_eq!(local_hit.primitive, SHARED_PRIMITIVE);
                            ray.max_t = local_hit.t;
                            hit = Some(TreeHit {
                                primitive: instance.primitive,
                                ..local_hit
                            });
                        }
                    }

                    for i in indices(triangles) {
                        if let Some(triangle_hit) = intersect_triangle(self.triangles.vertices(i), ray) {
                            ray.max_t = triangle_hit.t;
                            hit = Some(TreeHit {
                                primitive: self.triangles.primitive(i),
                                triangle: self.triangles.local_index(i),
                                t: triangle_hit.t,
                            });
                        }
                    }
                }
            }
        }

        hit
    }

    fn any_from(&self, root: NodeId, ray: &Ray) -> bool {
        let inv_direction = ray.direction.recip();
        let mut stack = NodeStack::new(root);

        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            if !node.bbox.hit_slabs(ray.origin, inv_direction, ray.min_t, ray.max_t) {
                continue;
            }

            match &node.kind {
                NodeKind::Internal { axis, children } => {
                    stack.push_children(children, axis_component(ray.direction, *axis));
                }
                NodeKind::Leaf { triangles, instances } => {
                    for instance in &self.instances[indices(instances)] {
                        if self.any_from(instance.root, &instance.local_ray(ray)) {
                            return true;
                        }
                    }

                    for i in indices(triangles) {
                        if intersect_triangle(self.triangles.vertices(i), ray).is_some() {
                            return true;
                        }
                    }
                }
            }
        }

        false
    }
}

#[inline]
fn axis_component(direction: DVec3, axis: u8) -> f64 {
    direction[axis as usize]
}
