//! Ray/triangle intersection kernel.
//!
//! Uses the Möller-Trumbore algorithm. Vertices are stored in single
//! precision and promoted to `f64` for the test.

use glam::DVec3;

use crate::{Ray, Vec3};

/// Slack on the barycentric range so rays hitting a shared edge are never
/// lost between two adjacent triangles.
pub const BARYCENTRIC_EPSILON: f64 = 1e-10;

/// Parameters of a ray/triangle hit.
///
/// `b1` and `b2` are the barycentric weights of the second and third vertex;
/// the first vertex gets `1 - b1 - b2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f64,
    pub b1: f64,
    pub b2: f64,
}

impl TriangleHit {
    /// Weights of all three vertices.
    pub fn barycentrics(&self) -> [f64; 3] {
        [1.0 - self.b1 - self.b2, self.b1, self.b2]
    }
}

/// Intersect a ray with a triangle, accepting hits with `min_t <= t <= max_t`.
///
/// There is no explicit test for a ray parallel to the triangle. A zero
/// divisor makes the barycentrics infinite or NaN, and every comparison below
/// is written so that NaN and out-of-range infinities fall through to `None`.
#[inline]
pub fn intersect_triangle(vertices: &[Vec3; 3], ray: &Ray) -> Option<TriangleHit> {
    let v0 = vertices[0].as_dvec3();
    let e1 = vertices[1].as_dvec3() - v0;
    let e2 = vertices[2].as_dvec3() - v0;

    let s1 = ray.direction.cross(e2);
    let inv_divisor = 1.0 / s1.dot(e1);

    let d = ray.origin - v0;
    let b1 = d.dot(s1) * inv_divisor;
    if !(b1 > -BARYCENTRIC_EPSILON && b1 < 1.0 + BARYCENTRIC_EPSILON) {
        return None;
    }

    let s2 = d.cross(e1);
    let b2 = ray.direction.dot(s2) * inv_divisor;
    if !(b2 > -BARYCENTRIC_EPSILON && b1 + b2 < 1.0 + BARYCENTRIC_EPSILON) {
        return None;
    }

    let t = e2.dot(s2) * inv_divisor;
    if t >= ray.min_t && t <= ray.max_t {
        Some(TriangleHit { t, b1, b2 })
    } else {
        None
    }
}

/// Barycentrics and `t` of the point where a line meets the triangle's plane,
/// without any range checks.
///
/// Used to re-derive the exact hit on a triangle already known to be hit, and
/// to intersect differential rays with the plane. Returns `None` only when the
/// line is parallel to the plane.
pub fn plane_intersection(vertices: &[DVec3; 3], origin: DVec3, direction: DVec3) -> Option<TriangleHit> {
    let e1 = vertices[1] - vertices[0];
    let e2 = vertices[2] - vertices[0];

    let s1 = direction.cross(e2);
    let inv_divisor = 1.0 / s1.dot(e1);

    let d = origin - vertices[0];
    let s2 = d.cross(e1);
    let hit = TriangleHit {
        t: e2.dot(s2) * inv_divisor,
        b1: d.dot(s1) * inv_divisor,
        b2: direction.dot(s2) * inv_divisor,
    };

    (hit.t.is_finite() && hit.b1.is_finite() && hit.b2.is_finite()).then_some(hit)
}
