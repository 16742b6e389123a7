// Transform utilities for DMat4
//
// Extends glam::DMat4 with the operations the accelerator needs: moving rays
// between world and mesh space, bounding transformed boxes and mapping normals.
// Note: glam::DMat4 already provides transform_point3(), transform_vector3() and inverse()

use glam::{DMat3, DMat4, DVec3};

use crate::{Aabb, Differentials, Ray, RayDifferential};

/// Extension trait for DMat4 to provide additional transform utilities
pub trait TransformExt {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transform a ray. The direction is not renormalised, so a parameter `t`
    /// names the same point before and after the transform.
    fn transform_ray(&self, ray: &Ray) -> Ray;

    /// Transform a ray together with its differentials.
    fn transform_ray_differential(&self, ray: &RayDifferential) -> RayDifferential;

    /// Matrix that maps normals: the inverse transpose of the upper 3x3.
    fn normal_matrix(&self) -> DMat3;
}

impl TransformExt for DMat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }

        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        for corner in aabb.corners() {
            let p = self.transform_point3(corner.as_dvec3());
            min = min.min(p);
            max = max.max(p);
        }

        Aabb::from_dpoints(min, max)
    }

    fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray {
            origin: self.transform_point3(ray.origin),
            direction: self.transform_vector3(ray.direction),
            min_t: ray.min_t,
            max_t: ray.max_t,
        }
    }

    fn transform_ray_differential(&self, ray: &RayDifferential) -> RayDifferential {
        RayDifferential {
            ray: self.transform_ray(&ray.ray),
            differentials: ray.differentials.map(|d| Differentials {
                origin_dx: self.transform_point3(d.origin_dx),
                direction_dx: self.transform_vector3(d.direction_dx),
                origin_dy: self.transform_point3(d.origin_dy),
                direction_dy: self.transform_vector3(d.direction_dy),
            }),
        }
    }

    fn normal_matrix(&self) -> DMat3 {
        DMat3::from_mat4(*self).inverse().transpose()
    }
}
