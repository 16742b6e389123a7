//! Tern Accel - Ternary SAH triangle accelerator with instancing.
//!
//! The accelerator answers nearest-hit and any-hit ray queries over the
//! triangles of a set of primitives:
//!
//! - **Ternary tree**: each split plane sorts items into below, above and
//!   straddling children, so no triangle is ever duplicated or clipped
//! - **SAH splits**: candidate planes are binned on every axis and scored by
//!   the surface area heuristic, axes evaluated in parallel for large nodes
//! - **Instancing**: a mesh placed more than once is built once in mesh
//!   space and referenced by one instance per placement
//! - **Arena storage**: nodes live in one flat vector and are walked with a
//!   fixed-size stack
//!
//! # Example
//!
//! ```
//! use tern_accel::Accelerator;
//! use tern_core::{shapes, Scene, Transform};
//! use tern_math::{DVec3, Ray, Vec3};
//!
//! let mut scene = Scene::new("example");
//! let cube = scene.add_mesh(shapes::cube(Vec3::splat(-0.5), Vec3::splat(0.5)));
//! scene.add_primitive(&cube, &Transform::default());
//!
//! let accel = Accelerator::from_scene(&scene);
//! let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));
//!
//! let hit = accel.nearest_hit(&ray).unwrap();
//! assert!((hit.t - 4.5).abs() < 1e-12);
//! assert!(accel.intersect_any(&ray));
//! ```

pub mod accelerator;
pub mod arena;
mod build;
pub mod config;
pub mod error;
mod extract;
pub mod instance;
mod sah;
mod traverse;
pub mod triangles;

#[cfg(test)]
mod testing;

pub use accelerator::{Accelerator, Hit, Intersection, TreeStats};
pub use arena::{Node, NodeArena, NodeId, NodeKind};
pub use config::{AccelConfig, MAX_SUPPORTED_DEPTH};
pub use error::{AccelError, AccelResult, ConfigError};
pub use instance::Instance;
pub use triangles::{TriangleStore, SHARED_PRIMITIVE};
