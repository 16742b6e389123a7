// Re-export glam for convenience
pub use glam::*;

// Tern math types
mod aabb;
mod interval;
mod ray;
mod transform;
pub mod triangle;

pub use aabb::{Aabb, AABB_PAD};
pub use interval::Interval;
pub use ray::{Differentials, Ray, RayDifferential};
pub use transform::TransformExt;
pub use triangle::{intersect_triangle, TriangleHit};
