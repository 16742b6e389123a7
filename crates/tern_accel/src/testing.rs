//! Scene generators and reference checks shared by the unit tests.

use std::collections::HashSet;
use std::f64::consts::TAU;
use std::ops::Range;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tern_core::{Mesh, MeshHandle, MeshId, Primitive};
use tern_math::{intersect_triangle, Aabb, DMat4, DQuat, DVec3, EulerRot, Ray, Vec3};

use crate::accelerator::{Accelerator, Hit};
use crate::arena::{NodeId, NodeKind};
use crate::triangles::SHARED_PRIMITIVE;

const TRIANGLES_PER_MESH: usize = 100;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

/// Random rotation with per-axis scale drawn from `scale` and translation
/// within `extent` of the origin.
fn random_affine(rng: &mut StdRng, scale: Range<f64>, extent: f64) -> DMat4 {
    let scale = DVec3::new(
        rng.gen_range(scale.clone()),
        rng.gen_range(scale.clone()),
        rng.gen_range(scale),
    );
    let rotation = DQuat::from_euler(
        EulerRot::YXZ,
        rng.gen_range(0.0..TAU),
        rng.gen_range(0.0..TAU),
        rng.gen_range(0.0..TAU),
    );
    let translation = random_point(rng, extent as f32).as_dvec3();
    DMat4::from_scale_rotation_translation(scale, rotation, translation)
}

fn primitives_from_meshes(meshes: Vec<(Mesh, DMat4)>) -> Vec<Primitive> {
    meshes
        .into_iter()
        .enumerate()
        .map(|(id, (mesh, mesh_to_world))| {
            let handle = MeshHandle::new(MeshId(id as u32), Arc::new(mesh));
            Primitive::new(handle, mesh_to_world, id)
        })
        .collect()
}

/// Small random triangles packed into a cube, split over single-placement
/// meshes, each rotated, scaled and translated.
pub fn random_triangle_scene(triangle_count: usize, seed: u64) -> Vec<Primitive> {
    let mut rng = StdRng::seed_from_u64(seed);
    let extent = (triangle_count as f32).cbrt() * 2.0;

    let mut meshes = Vec::new();
    let mut remaining = triangle_count;
    while remaining > 0 {
        let count = remaining.min(TRIANGLES_PER_MESH);
        remaining -= count;

        let mut positions = Vec::with_capacity(count * 3);
        for _ in 0..count {
            let center = random_point(&mut rng, extent * 0.5);
            for _ in 0..3 {
                positions.push(center + random_point(&mut rng, 1.5));
            }
        }
        let indices = (0..positions.len() as u32).collect();
        let mesh_to_world = random_affine(&mut rng, 0.6..1.6, f64::from(extent) * 0.5);
        meshes.push((Mesh::new(positions, indices, None), mesh_to_world));
    }

    primitives_from_meshes(meshes)
}

/// Triangles with roughly unit-length edges from their first vertex,
/// scattered through a cube of half-size `extent`, one mesh each. Every mesh
/// sits at its own origin and is moved into place by its transform.
pub fn scattered_triangles(triangle_count: usize, extent: f32, seed: u64) -> Vec<Primitive> {
    let mut rng = StdRng::seed_from_u64(seed);

    let meshes = (0..triangle_count)
        .map(|_| {
            let mut edge = || random_point(&mut rng, 1.0).try_normalize().unwrap_or(Vec3::X);
            let positions = vec![Vec3::ZERO, edge(), edge()];
            let mesh_to_world = random_affine(&mut rng, 0.8..1.25, f64::from(extent));
            (Mesh::new(positions, vec![0, 1, 2], None), mesh_to_world)
        })
        .collect();

    primitives_from_meshes(meshes)
}

/// Normalized rays starting in and around the accelerator's bounds. Half of
/// them aim at a random triangle's centroid so hits are common.
pub fn random_rays(accel: &Accelerator, count: usize, seed: u64) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    let bounds = accel.world_bounds();
    let center = bounds.centroid().as_dvec3();
    let half = (bounds.max() - bounds.min()).as_dvec3() * 0.75;

    let targets: Vec<(usize, usize)> = accel
        .primitives()
        .iter()
        .enumerate()
        .flat_map(|(p, primitive)| (0..primitive.mesh.mesh.triangle_count()).map(move |t| (p, t)))
        .collect();

    let mut rays = Vec::with_capacity(count);
    while rays.len() < count {
        let origin = center
            + DVec3::new(
                rng.gen_range(-1.0..1.0) * half.x,
                rng.gen_range(-1.0..1.0) * half.y,
                rng.gen_range(-1.0..1.0) * half.z,
            );

        let direction = if rng.gen_bool(0.5) && !targets.is_empty() {
            let (p, t) = targets[rng.gen_range(0..targets.len())];
            let primitive = &accel.primitives()[p];
            let [a, b, c] = primitive.mesh.mesh.triangle_vertices_world(t, &primitive.mesh_to_world);
            ((a + b + c) / 3.0).as_dvec3() - origin
        } else {
            DVec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        };

        if direction.length_squared() > 1e-12 {
            rays.push(Ray::new(origin, direction.normalize()));
        }
    }

    rays
}

/// Nearest hit by testing every world-space triangle of every primitive.
/// The first triangle wins ties.
pub fn brute_force_nearest(primitives: &[Primitive], ray: &Ray) -> Option<Hit> {
    let mut best: Option<Hit> = None;

    for (index, primitive) in primitives.iter().enumerate() {
        let mesh = &primitive.mesh.mesh;
        for triangle in 0..mesh.triangle_count() {
            let vertices = mesh.triangle_vertices_world(triangle, &primitive.mesh_to_world);
            let Some(hit) = intersect_triangle(&vertices, ray) else {
                continue;
            };
            if best.map_or(true, |best| hit.t < best.t) {
                best = Some(Hit {
                    primitive: index,
                    primitive_id: primitive.id,
                    triangle,
                    t: hit.t,
                });
            }
        }
    }

    best
}

/// Both found nothing, or both found the same distance. On a tie the
/// reported triangle only has to be hit at that distance too.
pub fn assert_same_hit(primitives: &[Primitive], ray: &Ray, got: Option<Hit>, expected: Option<Hit>) {
    match (got, expected) {
        (None, None) => {}
        (Some(got), Some(expected)) => {
            assert_eq!(got.t, expected.t, "distance differs for {ray:?}");
            if (got.primitive, got.triangle) != (expected.primitive, expected.triangle) {
                let primitive = &primitives[got.primitive];
                let vertices = primitive
                    .mesh
                    .mesh
                    .triangle_vertices_world(got.triangle, &primitive.mesh_to_world);
                let tie = intersect_triangle(&vertices, ray).map(|hit| hit.t);
                assert_eq!(tie, Some(expected.t), "{got:?} is not a tie with {expected:?}");
            }
            assert_eq!(got.primitive_id, primitives[got.primitive].id);
        }
        (got, expected) => panic!("got {got:?}, expected {expected:?} for {ray:?}"),
    }
}

/// Walk the main tree and every shared subtree, checking:
/// - each node's box holds its children and leaf items,
/// - no leaf is deeper than the configured limit,
/// - every stored triangle and every instance is referenced by exactly one leaf,
/// - subtrees hold only mesh-space triangles and no instances.
pub fn check_tree(accel: &Accelerator) {
    let tree = accel.tree();
    let max_depth = accel.config().max_depth;

    let mut seen_triangles = vec![0usize; tree.triangles.len()];
    let mut seen_instances = vec![0usize; tree.instances.len()];

    let subtree_roots: HashSet<NodeId> = tree.instances.iter().map(|instance| instance.root).collect();
    let roots = tree.root.into_iter().map(|root| (root, false));
    let roots = roots.chain(subtree_roots.into_iter().map(|root| (root, true)));

    for (root, shared) in roots {
        let mut pending = vec![(root, 0usize)];
        while let Some((id, depth)) = pending.pop() {
            assert!(depth <= max_depth, "node at depth {depth} exceeds {max_depth}");
            let node = &tree.arena[id];

            match &node.kind {
                NodeKind::Internal { children, .. } => {
                    assert!(children.iter().any(Option::is_some));
                    for &child in children.iter().flatten() {
                        assert!(node.bbox.contains(&tree.arena[child].bbox));
                        pending.push((child, depth + 1));
                    }
                }
                NodeKind::Leaf { triangles, instances } => {
                    for i in triangles.start as usize..triangles.end as usize {
                        assert!(node.bbox.contains(&tree.triangles.bbox(i)));
                        assert_eq!(tree.triangles.primitive(i) == SHARED_PRIMITIVE, shared);
                        seen_triangles[i] += 1;
                    }
                    assert!(!shared || instances.is_empty());
                    for i in instances.start as usize..instances.end as usize {
                        assert!(node.bbox.contains(&tree.instances[i].world_bbox));
                        seen_instances[i] += 1;
                    }
                }
            }
        }
    }

    assert!(seen_triangles.iter().all(|&count| count == 1), "triangle not in exactly one leaf");
    assert!(seen_instances.iter().all(|&count| count == 1), "instance not in exactly one leaf");

    let bounds = accel.world_bounds();
    for instance in &tree.instances {
        assert!(bounds.contains(&instance.world_bbox));
    }
    if tree.root.is_none() {
        assert_eq!(bounds, Aabb::EMPTY);
    }
}
