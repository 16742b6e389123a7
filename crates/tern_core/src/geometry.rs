//! Local surface description at a ray hit.

use tern_math::{DMat4, DVec2, DVec3, TransformExt};

/// Differential geometry of a surface point.
///
/// Screen-space derivatives (`dp_dx`, `duv_dx`, ...) are zero when the ray
/// that produced the hit carried no differentials.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DifferentialGeometry {
    pub point: DVec3,
    /// Unit normal of the triangle plane, following the vertex winding.
    pub geometric_normal: DVec3,
    /// Unit interpolated vertex normal (equal to `geometric_normal` when the
    /// mesh has no normals).
    pub shading_normal: DVec3,
    pub uv: DVec2,
    pub duv_dx: DVec2,
    pub duv_dy: DVec2,
    pub dp_dx: DVec3,
    pub dp_dy: DVec3,
    /// Unit surface tangent along increasing `u`, orthogonal to the shading normal.
    pub tangent: DVec3,
    pub dn_du: DVec3,
    pub dn_dv: DVec3,
}

impl DifferentialGeometry {
    /// Map mesh-space geometry into the space of `mesh_to_world`.
    ///
    /// Points and vectors go through the matrix, normals and their
    /// derivatives through its inverse transpose.
    pub fn transformed(&self, mesh_to_world: &DMat4) -> DifferentialGeometry {
        let normal_matrix = mesh_to_world.normal_matrix();

        DifferentialGeometry {
            point: mesh_to_world.transform_point3(self.point),
            geometric_normal: (normal_matrix * self.geometric_normal).normalize(),
            shading_normal: (normal_matrix * self.shading_normal).normalize(),
            uv: self.uv,
            duv_dx: self.duv_dx,
            duv_dy: self.duv_dy,
            dp_dx: mesh_to_world.transform_vector3(self.dp_dx),
            dp_dy: mesh_to_world.transform_vector3(self.dp_dy),
            tangent: mesh_to_world.transform_vector3(self.tangent).normalize(),
            dn_du: normal_matrix * self.dn_du,
            dn_dv: normal_matrix * self.dn_dv,
        }
    }
}
