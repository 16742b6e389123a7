use glam::DVec3;

use crate::{Interval, Ray, Vec3};

/// Padding applied to degenerate (flat) boxes and around triangles.
pub const AABB_PAD: f32 = 0.0001;

/// Axis-Aligned Bounding Box used by the acceleration structure.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// Boxes are stored in single precision and tested against double precision
/// rays.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create an AABB from two corner points.
    ///
    /// Axes thinner than [`AABB_PAD`] are widened so no box has zero extent.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let x = Interval::new(a.x.min(b.x), a.x.max(b.x));
        let y = Interval::new(a.y.min(b.y), a.y.max(b.y));
        let z = Interval::new(a.z.min(b.z), a.z.max(b.z));

        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB from double precision corners, rounding outwards so the
    /// single precision box still contains both points.
    pub fn from_dpoints(a: DVec3, b: DVec3) -> Self {
        let lo = a.min(b);
        let hi = a.max(b);
        let min = Vec3::new(round_down(lo.x), round_down(lo.y), round_down(lo.z));
        let max = Vec3::new(round_up(hi.x), round_up(hi.y), round_up(hi.z));
        Self::from_points(min, max)
    }

    /// Bounding box of a triangle, padded by [`AABB_PAD`] on every side.
    ///
    /// Triangle tests accept barycentrics slightly outside `[0, 1]`, so the
    /// box must be a little larger than the triangle itself.
    pub fn around_triangle(vertices: &[Vec3; 3]) -> Self {
        let [v0, v1, v2] = *vertices;
        let min = v0.min(v1).min(v2) - Vec3::splat(AABB_PAD);
        let max = v0.max(v1).max(v2) + Vec3::splat(AABB_PAD);
        Self::from_points(min, max)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    #[inline]
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// True if any axis is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// True if `other` is entirely inside this box. Empty boxes are inside everything.
    pub fn contains(&self, other: &Aabb) -> bool {
        other.is_empty()
            || (self.x.contains_interval(&other.x)
                && self.y.contains_interval(&other.y)
                && self.z.contains_interval(&other.z))
    }

    /// Surface area in double precision; zero for an empty box.
    pub fn surface_area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let dx = self.x.size() as f64;
        let dy = self.y.size() as f64;
        let dz = self.z.size() as f64;
        2.0 * (dx * dy + dy * dz + dz * dx)
    }

    /// The eight corners, `i & 1` selecting max x, `i & 2` max y, `i & 4` max z.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 != 0 { self.x.max } else { self.x.min },
                if i & 2 != 0 { self.y.max } else { self.y.min },
                if i & 4 != 0 { self.z.max } else { self.z.min },
            )
        })
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(
            (self.x.min + self.x.max) * 0.5,
            (self.y.min + self.y.max) * 0.5,
            (self.z.min + self.z.max) * 0.5,
        )
    }

    /// Test if a ray intersects this AABB within the ray's `[min_t, max_t]`.
    pub fn hit(&self, ray: &Ray) -> bool {
        self.hit_slabs(ray.origin, ray.direction.recip(), ray.min_t, ray.max_t)
    }

    /// Slab test with a precomputed reciprocal direction.
    ///
    /// A zero direction component gives an infinite reciprocal; an origin on a
    /// slab plane then produces `0 * inf = NaN`. The test is written purely as
    /// `>` comparisons so NaN never culls the box and infinities order
    /// correctly.
    #[inline]
    pub fn hit_slabs(&self, origin: DVec3, inv_direction: DVec3, min_t: f64, max_t: f64) -> bool {
        let (near_x, far_x) = slab(self.x, origin.x, inv_direction.x);
        let (near_y, far_y) = slab(self.y, origin.y, inv_direction.y);
        let (near_z, far_z) = slab(self.z, origin.z, inv_direction.z);

        let culled = min_t > far_x
            || min_t > far_y
            || min_t > far_z
            || near_x > max_t
            || near_y > max_t
            || near_z > max_t
            || near_x > far_y
            || near_x > far_z
            || near_y > far_x
            || near_y > far_z
            || near_z > far_x
            || near_z > far_y;
        !culled
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        if self.x.size() < AABB_PAD {
            self.x = self.x.expand(AABB_PAD);
        }
        if self.y.size() < AABB_PAD {
            self.y = self.y.expand(AABB_PAD);
        }
        if self.z.size() < AABB_PAD {
            self.z = self.z.expand(AABB_PAD);
        }
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[inline]
fn slab(interval: Interval, origin: f64, inv_direction: f64) -> (f64, f64) {
    let t0 = (interval.min as f64 - origin) * inv_direction;
    let t1 = (interval.max as f64 - origin) * inv_direction;
    if t0 > t1 {
        (t1, t0)
    } else {
        (t0, t1)
    }
}

fn round_down(x: f64) -> f32 {
    let f = x as f32;
    if f as f64 > x {
        f - f.abs() * f32::EPSILON - f32::MIN_POSITIVE
    } else {
        f
    }
}

fn round_up(x: f64) -> f32 {
    let f = x as f32;
    if (f as f64) < x {
        f + f.abs() * f32::EPSILON + f32::MIN_POSITIVE
    } else {
        f
    }
}
