//! Builds a procedural scene, fires random rays through it and reports how
//! the accelerator did.
//!
//! Run with: cargo run --release -p tern_probe -- [config.json]

use std::env;
use std::fs;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use tern_accel::{AccelConfig, Accelerator, Hit};
use tern_core::{shapes, Mesh, Primitive, Scene, Transform};
use tern_math::{intersect_triangle, DVec3, EulerRot, Quat, Ray, Vec3};

/// Probe settings, read from an optional JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ProbeConfig {
    accel: AccelConfig,
    /// Scattered triangles in the single unique mesh
    triangles: usize,
    /// Placements of the shared sphere mesh
    instances: usize,
    rays: usize,
    seed: u64,
    /// Rays to check against a brute-force search; 0 disables the check
    verify: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            accel: AccelConfig::default(),
            triangles: 50_000,
            instances: 64,
            rays: 1_000_000,
            seed: 1,
            verify: 1_000,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => {
            let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {path}"))?
        }
        None => ProbeConfig::default(),
    };
    log::info!("Probe config: {}", serde_json::to_string(&config)?);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let scene = build_scene(&config, &mut rng);
    log::info!(
        "Scene '{}': {} meshes, {} primitives, {} triangles",
        scene.name,
        scene.mesh_count(),
        scene.primitive_count(),
        scene.total_triangle_count()
    );

    let accel = Accelerator::with_config(scene.primitives.clone(), config.accel)?;
    println!("{:#?}", accel.stats());

    let rays = random_rays(&accel, config.rays, &mut rng);

    let start = Instant::now();
    let hits: Vec<Option<Hit>> = rays.par_iter().map(|ray| accel.nearest_hit(ray)).collect();
    let nearest_time = start.elapsed();

    let start = Instant::now();
    let occluded = rays.par_iter().filter(|ray| accel.intersect_any(ray)).count();
    let any_time = start.elapsed();

    let hit_count = hits.iter().flatten().count();
    if hit_count != occluded {
        bail!("nearest-hit found {hit_count} hits but any-hit found {occluded}");
    }

    let mrays = |seconds: f64| rays.len() as f64 / seconds / 1e6;
    println!(
        "{} rays, {} hits ({:.1}%)",
        rays.len(),
        hit_count,
        100.0 * hit_count as f64 / rays.len().max(1) as f64
    );
    println!(
        "nearest: {:.2?} ({:.2} Mrays/s), any: {:.2?} ({:.2} Mrays/s)",
        nearest_time,
        mrays(nearest_time.as_secs_f64()),
        any_time,
        mrays(any_time.as_secs_f64())
    );

    if config.verify > 0 {
        verify(&accel, &rays, &hits, config.verify)?;
    }

    Ok(())
}

fn build_scene(config: &ProbeConfig, rng: &mut StdRng) -> Scene {
    let mut scene = Scene::new("probe");
    let extent = (config.triangles.max(1) as f32).cbrt() * 2.0;

    if config.triangles > 0 {
        let mut positions = Vec::with_capacity(config.triangles * 3);
        for _ in 0..config.triangles {
            let center = random_point(rng, extent);
            for _ in 0..3 {
                positions.push(center + random_point(rng, 1.5));
            }
        }
        let indices = (0..positions.len() as u32).collect();
        let mut mesh = Mesh::new(positions, indices, None);
        mesh.compute_normals();

        let handle = scene.add_mesh(mesh);
        scene.add_primitive(&handle, &Transform::default());
    }

    if config.instances > 0 {
        let sphere = scene.add_mesh(shapes::uv_sphere(Vec3::ZERO, 1.0, 32, 64));
        for _ in 0..config.instances {
            let transform = Transform {
                translation: random_point(rng, extent),
                rotation: Quat::from_euler(
                    EulerRot::YXZ,
                    rng.gen_range(0.0..std::f32::consts::TAU),
                    rng.gen_range(0.0..std::f32::consts::TAU),
                    0.0,
                ),
                scale: Vec3::splat(rng.gen_range(0.5..3.0)),
            };
            scene.add_primitive(&sphere, &transform);
        }
    }

    scene
}

fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

/// Rays from a shell around the scene towards random points inside it.
fn random_rays(accel: &Accelerator, count: usize, rng: &mut StdRng) -> Vec<Ray> {
    let bounds = accel.world_bounds();
    if bounds.is_empty() {
        return Vec::new();
    }

    let center = bounds.centroid().as_dvec3();
    let half = (bounds.max() - bounds.min()).as_dvec3() * 0.5;
    let radius = half.length() * 1.5;

    let mut rays = Vec::with_capacity(count);
    while rays.len() < count {
        let along = DVec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        let target = center + along * half;
        let origin = center + along.normalize_or_zero() * radius;
        let direction = target - origin;
        if direction.length_squared() > 1e-12 {
            rays.push(Ray::new(origin, direction.normalize()));
        }
    }

    rays
}

/// Compare the first `count` results with a brute-force search.
///
/// Shared meshes are intersected in mesh space by the accelerator and in
/// world space here, so distances are compared with a tolerance.
fn verify(accel: &Accelerator, rays: &[Ray], hits: &[Option<Hit>], count: usize) -> Result<()> {
    let count = count.min(rays.len());
    let start = Instant::now();

    let mismatches = rays[..count]
        .par_iter()
        .zip(&hits[..count])
        .filter(|&(ray, hit)| {
            let expected = brute_force(accel.primitives(), ray);
            let agrees = match (hit, expected) {
                (None, None) => true,
                (Some(hit), Some(t)) => (hit.t - t).abs() <= 1e-5 * t.max(1.0),
                _ => false,
            };
            if !agrees {
                log::warn!("Mismatch for {ray:?}: accelerator {hit:?}, brute force {expected:?}");
            }
            !agrees
        })
        .count();

    println!("verified {count} rays in {:.2?}: {mismatches} mismatches", start.elapsed());

    // Rays grazing an instanced silhouette may land either side of it.
    if mismatches * 1000 > count {
        bail!("{mismatches} of {count} rays disagree with brute force");
    }
    Ok(())
}

fn brute_force(primitives: &[Primitive], ray: &Ray) -> Option<f64> {
    primitives
        .iter()
        .flat_map(|primitive| {
            let mesh = &primitive.mesh.mesh;
            (0..mesh.triangle_count()).map(move |triangle| mesh.triangle_vertices_world(triangle, &primitive.mesh_to_world))
        })
        .filter_map(|vertices| intersect_triangle(&vertices, ray).map(|hit| hit.t))
        .min_by(f64::total_cmp)
}
