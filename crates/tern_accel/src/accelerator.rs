//! The public accelerator.

use std::collections::HashSet;
use std::time::Instant;

use tern_core::{DifferentialGeometry, Primitive, Scene};
use tern_math::{Aabb, DVec3, Ray, RayDifferential, TransformExt};

use crate::arena::{NodeId, NodeKind};
use crate::build::{build, BuiltTree};
use crate::config::AccelConfig;
use crate::error::AccelResult;

/// Slack past the hit triangle's plane when spawning rays, relative to the
/// magnitude of the hit point's coordinates.
const SPAWN_EPSILON: f64 = 1e-9;

/// Nearest-hit result without surface details.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Index of the primitive in the list the accelerator was built from
    pub primitive: usize,
    /// `Primitive::id` of that primitive
    pub primitive_id: usize,
    /// Triangle index within the primitive's mesh
    pub triangle: usize,
    pub t: f64,
}

/// Nearest hit plus the surface description at the hit point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub hit: Hit,
    /// World-space differential geometry
    pub dg: DifferentialGeometry,
    /// World-space vertex of the triangle exactly as the tree tests it
    plane_point: DVec3,
    /// Unit normal of that same triangle
    plane_normal: DVec3,
}

impl Intersection {
    /// Smallest `min_t` for a ray leaving the hit point along `direction`
    /// that cannot hit the same triangle again.
    ///
    /// The computed hit point sits slightly off the plane of the triangle
    /// the tree actually tested; the returned distance is just past where
    /// the outgoing ray crosses that plane, or zero when the ray moves away
    /// from it.
    pub fn next_min_t(&self, direction: DVec3) -> f64 {
        let denominator = direction.dot(self.plane_normal);
        if denominator == 0.0 {
            return 0.0;
        }

        let offset = (self.plane_point - self.dg.point).dot(self.plane_normal);
        let slack = SPAWN_EPSILON * self.dg.point.abs().max_element().max(1.0);
        let crossing = offset / denominator + slack / denominator.abs();
        if crossing.is_finite() {
            crossing.max(0.0)
        } else {
            0.0
        }
    }

    /// Ray leaving the hit point along `direction`.
    pub fn spawn_ray(&self, direction: DVec3) -> Ray {
        Ray::new(self.dg.point, direction).with_range(self.next_min_t(direction), f64::INFINITY)
    }
}

/// Shape of a built tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TreeStats {
    /// Nodes of the main tree and every shared subtree
    pub node_count: usize,
    pub leaf_count: usize,
    pub internal_count: usize,
    /// Deepest leaf of the main tree or any shared subtree
    pub max_depth: usize,
    pub max_leaf_items: usize,
    pub average_leaf_items: f64,
    /// Triangles stored once, either in world space or in a shared subtree
    pub triangle_count: usize,
    pub instance_count: usize,
    pub primitive_count: usize,
}

/// Ternary SAH tree over the triangles of a set of primitives.
///
/// Built once and immutable afterwards. Queries take `&self`, so one
/// accelerator can serve any number of threads.
#[derive(Debug)]
pub struct Accelerator {
    primitives: Vec<Primitive>,
    tree: BuiltTree,
    /// Per primitive: placed through an instance of a shared subtree
    instanced: Vec<bool>,
    config: AccelConfig,
    stats: TreeStats,
}

impl Accelerator {
    /// Build with the default configuration.
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self::build(primitives, AccelConfig::default())
    }

    /// Build with a custom configuration.
    pub fn with_config(primitives: Vec<Primitive>, config: AccelConfig) -> AccelResult<Self> {
        config.validate()?;
        Ok(Self::build(primitives, config))
    }

    /// Build over every primitive of a scene.
    pub fn from_scene(scene: &Scene) -> Self {
        Self::new(scene.primitives.clone())
    }

    fn build(primitives: Vec<Primitive>, config: AccelConfig) -> Self {
        let start = Instant::now();

        if primitives.is_empty() {
            log::warn!("Building accelerator over an empty scene");
        }

        let tree = build(&primitives, &config);
        let stats = collect_stats(&tree, primitives.len());

        let mut instanced = vec![false; primitives.len()];
        for instance in &tree.instances {
            instanced[instance.primitive as usize] = true;
        }

        log::info!(
            "Accelerator: {} primitives, {} triangles, {} instances, {} nodes ({} leaves), depth {}, built in {:.2?}",
            stats.primitive_count,
            stats.triangle_count,
            stats.instance_count,
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            start.elapsed()
        );

        Self {
            primitives,
            tree,
            instanced,
            config,
            stats,
        }
    }

    /// Bounds of everything in the accelerator; [`Aabb::EMPTY`] when there
    /// is nothing to hit.
    ///
    /// The box includes the padding around each triangle.
    pub fn world_bounds(&self) -> Aabb {
        self.tree
            .root
            .map_or(Aabb::EMPTY, |root| self.tree.arena[root].bbox)
    }

    /// Nearest hit within the ray's `[min_t, max_t]`.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<Hit> {
        debug_assert!(ray.direction.is_normalized(), "ray direction must be normalized");

        self.tree.nearest(ray).map(|hit| {
            let primitive = hit.primitive as usize;
            Hit {
                primitive,
                primitive_id: self.primitives[primitive].id,
                triangle: hit.triangle as usize,
                t: hit.t,
            }
        })
    }

    /// Nearest hit with full differential geometry.
    ///
    /// Only the winning triangle is handed to its mesh: the ray is moved
    /// into mesh space, and the mesh's result is moved back to world space.
    pub fn intersect_nearest(&self, ray: &RayDifferential) -> Option<Intersection> {
        let hit = self.nearest_hit(&ray.ray)?;

        let primitive = &self.primitives[hit.primitive];
        let mesh = &primitive.mesh.mesh;
        let mesh_to_world = &primitive.mesh_to_world;
        let local_ray = mesh_to_world.inverse().transform_ray_differential(ray);

        let dg = mesh
            .compute_differential_geometry(hit.triangle, &local_ray)
            .transformed(mesh_to_world);

        // Instances are tested in mesh space, which maps onto the world plane
        // exactly; everything else is tested on its f32 world-space copy.
        let (plane_point, plane_normal) = if self.instanced[hit.primitive] {
            let [v0, _, _] = mesh.triangle_vertices(hit.triangle);
            (mesh_to_world.transform_point3(v0.as_dvec3()), dg.geometric_normal)
        } else {
            let [v0, v1, v2] = mesh
                .triangle_vertices_world(hit.triangle, mesh_to_world)
                .map(|v| v.as_dvec3());
            (v0, (v1 - v0).cross(v2 - v0).normalize_or_zero())
        };

        Some(Intersection {
            hit,
            dg,
            plane_point,
            plane_normal,
        })
    }

    /// Whether the ray hits anything within `[min_t, max_t]`.
    pub fn intersect_any(&self, ray: &Ray) -> bool {
        debug_assert!(ray.direction.is_normalized(), "ray direction must be normalized");
        self.tree.any(ray)
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn config(&self) -> &AccelConfig {
        &self.config
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    #[cfg(test)]
    pub(crate) fn tree(&self) -> &BuiltTree {
        &self.tree
    }
}

fn collect_stats(tree: &BuiltTree, primitive_count: usize) -> TreeStats {
    let mut stats = TreeStats {
        node_count: tree.arena.len(),
        triangle_count: tree.triangles.len(),
        instance_count: tree.instances.len(),
        primitive_count,
        ..TreeStats::default()
    };

    let mut leaf_items = 0;
    for node in tree.arena.iter() {
        match &node.kind {
            NodeKind::Leaf { triangles, instances } => {
                let items = triangles.len() + instances.len();
                stats.leaf_count += 1;
                stats.max_leaf_items = stats.max_leaf_items.max(items);
                leaf_items += items;
            }
            NodeKind::Internal { .. } => stats.internal_count += 1,
        }
    }
    if stats.leaf_count > 0 {
        stats.average_leaf_items = leaf_items as f64 / stats.leaf_count as f64;
    }

    let subtree_roots: HashSet<NodeId> = tree.instances.iter().map(|instance| instance.root).collect();
    let mut pending: Vec<(NodeId, usize)> = tree.root.into_iter().chain(subtree_roots).map(|id| (id, 0)).collect();
    while let Some((id, depth)) = pending.pop() {
        stats.max_depth = stats.max_depth.max(depth);
        if let NodeKind::Internal { children, .. } = &tree.arena[id].kind {
            pending.extend(children.iter().flatten().map(|&child| (child, depth + 1)));
        }
    }

    stats
}
