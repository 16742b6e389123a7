//! Procedural meshes.

use std::f32::consts::{PI, TAU};

use tern_math::Vec3;

use crate::mesh::Mesh;

/// Axis-aligned cube with outward-facing triangles.
///
/// Corners are shared between faces, so the cube is closed and every edge
/// belongs to exactly two triangles.
pub fn cube(min: Vec3, max: Vec3) -> Mesh {
    let positions = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 != 0 { max.x } else { min.x },
                if i & 2 != 0 { max.y } else { min.y },
                if i & 4 != 0 { max.z } else { min.z },
            )
        })
        .collect();

    #[rustfmt::skip]
    let indices = vec![
        4, 5, 7,  4, 7, 6, // +Z
        0, 2, 3,  0, 3, 1, // -Z
        1, 3, 7,  1, 7, 5, // +X
        0, 4, 6,  0, 6, 2, // -X
        2, 6, 7,  2, 7, 3, // +Y
        0, 1, 5,  0, 5, 4, // -Y
    ];

    Mesh::new(positions, indices, None)
}

/// UV sphere with smooth normals and a latitude/longitude parameterisation.
///
/// `rings` is the number of latitude bands (at least 2), `segments` the
/// number of longitude slices (at least 3). The seam column is duplicated so
/// uvs stay continuous.
pub fn uv_sphere(center: Vec3, radius: f32, rings: u32, segments: u32) -> Mesh {
    if rings < 2 || segments < 3 {
        log::warn!("uv_sphere: clamping {rings} rings x {segments} segments to at least 2 x 3");
    }
    let rings = rings.max(2);
    let segments = segments.max(3);
    let columns = segments + 1;

    let mut positions = Vec::with_capacity(((rings + 1) * columns) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut uvs = Vec::with_capacity(positions.capacity());

    for i in 0..=rings {
        let v = i as f32 / rings as f32;
        let theta = v * PI;
        for j in 0..=segments {
            let u = j as f32 / segments as f32;
            let phi = u * TAU;
            let normal = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            positions.push(center + radius * normal);
            normals.push(normal);
            uvs.push([u, v]);
        }
    }

    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
    for i in 0..rings {
        for j in 0..segments {
            let a = i * columns + j;
            let b = a + columns;
            let c = a + 1;
            let d = b + 1;

            // The pole rows collapse one triangle of each quad.
            if i != 0 {
                indices.extend_from_slice(&[a, c, b]);
            }
            if i != rings - 1 {
                indices.extend_from_slice(&[c, d, b]);
            }
        }
    }

    Mesh::new_with_uvs(positions, indices, Some(normals), Some(uvs))
}

/// Quad from four corners in counter-clockwise order, split along `p0-p2`.
pub fn quad(corners: [Vec3; 4]) -> Mesh {
    let uvs = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    Mesh::new_with_uvs(corners.to_vec(), vec![0, 1, 2, 0, 2, 3], None, Some(uvs))
}
