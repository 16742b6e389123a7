use glam::DVec3;

/// A ray in 3D space with origin, direction and a parametric range.
///
/// Rays are kept in double precision: scene geometry is stored as `f32`, but
/// the intersection arithmetic runs in `f64`. Only points with
/// `min_t <= t <= max_t` count as hits.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
    pub min_t: f64,
    pub max_t: f64,
}

impl Ray {
    /// Create a ray covering `[0, inf)`.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction,
            min_t: 0.0,
            max_t: f64::INFINITY,
        }
    }

    /// Same ray with a different parametric range.
    pub fn with_range(self, min_t: f64, max_t: f64) -> Self {
        Self {
            min_t,
            max_t,
            ..self
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(DVec3::ZERO, DVec3::Z)
    }
}

/// Auxiliary rays offset by one pixel in x and y on the image plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Differentials {
    pub origin_dx: DVec3,
    pub direction_dx: DVec3,
    pub origin_dy: DVec3,
    pub direction_dy: DVec3,
}

/// A ray plus optional screen-space differentials.
///
/// Differentials are only used when computing the differential geometry of
/// the final hit; traversal looks at `ray` alone.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct RayDifferential {
    pub ray: Ray,
    pub differentials: Option<Differentials>,
}

impl RayDifferential {
    pub fn new(ray: Ray, differentials: Differentials) -> Self {
        Self {
            ray,
            differentials: Some(differentials),
        }
    }
}

impl From<Ray> for RayDifferential {
    fn from(ray: Ray) -> Self {
        Self {
            ray,
            differentials: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(DVec3::ZERO, DVec3::X);

        assert_eq!(ray.at(0.0), DVec3::ZERO);
        assert_eq!(ray.at(1.0), DVec3::X);
        assert_eq!(ray.at(2.0), DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), DVec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_default_range() {
        let ray = Ray::new(DVec3::ZERO, DVec3::Y);
        assert_eq!(ray.min_t, 0.0);
        assert_eq!(ray.max_t, f64::INFINITY);

        let clipped = ray.with_range(1.0, 2.0);
        assert_eq!(clipped.origin, ray.origin);
        assert_eq!(clipped.direction, ray.direction);
        assert_eq!((clipped.min_t, clipped.max_t), (1.0, 2.0));
    }

    #[test]
    fn test_ray_differential_from_ray() {
        let ray = Ray::new(DVec3::ONE, DVec3::Z);
        let rd = RayDifferential::from(ray);
        assert_eq!(rd.ray, ray);
        assert!(rd.differentials.is_none());
    }
}
