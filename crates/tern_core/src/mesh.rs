//! Triangle mesh geometry.
//!
//! A `Mesh` is the geometry collaborator of the accelerator: it hands out
//! vertices and triangles during the build, and computes the full
//! differential geometry of the one triangle a query finally hits.

use tern_math::triangle::{plane_intersection, TriangleHit};
use tern_math::{Aabb, DMat4, DVec2, DVec3, RayDifferential, Vec3};

use crate::error::{MeshError, MeshResult};
use crate::geometry::DifferentialGeometry;

/// UV parameterisation used when a mesh carries no UVs.
const DEFAULT_UVS: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];

/// A mesh consisting of vertex positions, optional normals and UVs, and
/// triangle indices.
///
/// Triangles wind counter-clockwise: the geometric normal is
/// `(v1 - v0) x (v2 - v0)`.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional, used for shading normals)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from trusted data.
    ///
    /// Indices are not validated; a bad index is a programming error that
    /// panics when the triangle is first read. Use [`Mesh::try_new`] for data
    /// from outside the program.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            bounds,
        }
    }

    /// Create a new mesh with UV coordinates.
    pub fn new_with_uvs(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<[f32; 2]>>,
    ) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    /// Create a mesh after checking indices and attribute lengths.
    pub fn try_new(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<[f32; 2]>>,
    ) -> MeshResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }

        let vertex_count = positions.len();
        if let Some(position) = indices.iter().position(|&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfBounds {
                triangle: position / 3,
                index: indices[position],
                vertex_count,
            });
        }

        if let Some(normals) = &normals {
            check_attribute("normals", normals.len(), vertex_count)?;
        }
        if let Some(uvs) = &uvs {
            check_attribute("uvs", uvs.len(), vertex_count)?;
        }

        Ok(Self::new_with_uvs(positions, indices, normals, uvs))
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        if positions.is_empty() {
            return Aabb::EMPTY;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for pos in positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        Aabb::from_points(min, max)
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Each vertex normal is the normalized, area-weighted average of the
    /// face normals of the triangles sharing that vertex.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            let face_normal = (self.positions[i1] - self.positions[i0])
                .cross(self.positions[i2] - self.positions[i0]);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Vec3 {
        self.positions[index]
    }

    /// Vertex indices of a triangle.
    #[inline]
    pub fn triangle(&self, index: usize) -> [u32; 3] {
        let base = index * 3;
        [self.indices[base], self.indices[base + 1], self.indices[base + 2]]
    }

    /// Mesh-space vertex positions of a triangle.
    #[inline]
    pub fn triangle_vertices(&self, index: usize) -> [Vec3; 3] {
        self.triangle(index).map(|i| self.vertex(i as usize))
    }

    /// World-space vertex positions of a triangle.
    ///
    /// The transform runs in double precision and the result is rounded back
    /// to `f32`. Anything that wants to reproduce the accelerator's world
    /// geometry bit for bit must go through this function.
    #[inline]
    pub fn triangle_vertices_world(&self, index: usize, mesh_to_world: &DMat4) -> [Vec3; 3] {
        self.triangle_vertices(index)
            .map(|v| mesh_to_world.transform_point3(v.as_dvec3()).as_vec3())
    }

    /// Unit geometric normal of a triangle in mesh space.
    pub fn geometric_normal(&self, index: usize) -> DVec3 {
        let [v0, v1, v2] = self.triangle_vertices(index).map(|v| v.as_dvec3());
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }

    /// Compute the differential geometry of a ray hit on `triangle`.
    ///
    /// The ray must be in mesh space and is expected to hit the triangle;
    /// the hit is re-derived here in full precision, so barycentrics slightly
    /// outside the triangle (edge hits) are accepted as is.
    pub fn compute_differential_geometry(
        &self,
        triangle: usize,
        ray: &RayDifferential,
    ) -> DifferentialGeometry {
        let indices = self.triangle(triangle).map(|i| i as usize);
        let vertices = indices.map(|i| self.positions[i].as_dvec3());
        let uvs = self.triangle_uvs(&indices);

        let hit = plane_intersection(&vertices, ray.ray.origin, ray.ray.direction).unwrap_or_else(|| {
            debug_assert!(false, "ray is parallel to triangle {triangle}");
            TriangleHit {
                t: ray.ray.min_t,
                b1: 1.0 / 3.0,
                b2: 1.0 / 3.0,
            }
        });

        let point = ray.ray.at(hit.t);
        let uv = interpolate_uv(&uvs, &hit);

        let e1 = vertices[1] - vertices[0];
        let e2 = vertices[2] - vertices[0];
        let geometric_normal = e1.cross(e2).normalize_or_zero();

        // Deltas for the uv partial derivatives.
        let du1 = uvs[1].x - uvs[0].x;
        let du2 = uvs[2].x - uvs[0].x;
        let dv1 = uvs[1].y - uvs[0].y;
        let dv2 = uvs[2].y - uvs[0].y;
        let determinant = du1 * dv2 - dv1 * du2;

        let (shading_normal, dn_du, dn_dv) = match &self.normals {
            Some(normals) => {
                let n = indices.map(|i| normals[i].as_dvec3());
                let [w0, w1, w2] = hit.barycentrics();
                let shading = (w0 * n[0] + w1 * n[1] + w2 * n[2])
                    .try_normalize()
                    .unwrap_or(geometric_normal);

                if determinant == 0.0 {
                    (shading, DVec3::ZERO, DVec3::ZERO)
                } else {
                    let inv = 1.0 / determinant;
                    let dn1 = n[1] - n[0];
                    let dn2 = n[2] - n[0];
                    (
                        shading,
                        (dv2 * dn1 - dv1 * dn2) * inv,
                        (-du2 * dn1 + du1 * dn2) * inv,
                    )
                }
            }
            None => (geometric_normal, DVec3::ZERO, DVec3::ZERO),
        };

        let dp_du = if determinant == 0.0 {
            e1
        } else {
            (dv2 * e1 - dv1 * e2) / determinant
        };
        let tangent = (dp_du - shading_normal * shading_normal.dot(dp_du))
            .try_normalize()
            .unwrap_or_else(|| shading_normal.any_orthonormal_vector());

        let mut dg = DifferentialGeometry {
            point,
            geometric_normal,
            shading_normal,
            uv,
            tangent,
            dn_du,
            dn_dv,
            ..Default::default()
        };

        if let Some(d) = &ray.differentials {
            let hit_x = plane_intersection(&vertices, d.origin_dx, d.direction_dx);
            let hit_y = plane_intersection(&vertices, d.origin_dy, d.direction_dy);
            if let (Some(hx), Some(hy)) = (hit_x, hit_y) {
                dg.dp_dx = d.origin_dx + d.direction_dx * hx.t - point;
                dg.dp_dy = d.origin_dy + d.direction_dy * hy.t - point;
                dg.duv_dx = interpolate_uv(&uvs, &hx) - uv;
                dg.duv_dy = interpolate_uv(&uvs, &hy) - uv;
            }
        }

        dg
    }

    fn triangle_uvs(&self, indices: &[usize; 3]) -> [DVec2; 3] {
        match &self.uvs {
            Some(uvs) => indices.map(|i| DVec2::new(uvs[i][0] as f64, uvs[i][1] as f64)),
            None => DEFAULT_UVS.map(|[u, v]| DVec2::new(u as f64, v as f64)),
        }
    }
}

fn interpolate_uv(uvs: &[DVec2; 3], hit: &TriangleHit) -> DVec2 {
    let [w0, w1, w2] = hit.barycentrics();
    w0 * uvs[0] + w1 * uvs[1] + w2 * uvs[2]
}

fn check_attribute(attribute: &'static str, actual: usize, expected: usize) -> MeshResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(MeshError::AttributeLength {
            attribute,
            expected,
            actual,
        })
    }
}
