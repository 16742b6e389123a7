//! Tern Core - Mesh geometry and scene registration.
//!
//! This crate provides:
//!
//! - **Mesh geometry**: `Mesh`, the triangle store the accelerator reads and
//!   the source of `DifferentialGeometry` for the winning hit
//! - **Scene registration**: `Scene`, `MeshHandle`, `Primitive`
//! - **Procedural shapes**: cubes, uv spheres and quads
//!
//! # Example
//!
//! ```
//! use tern_core::{shapes, Scene, Transform};
//! use tern_math::Vec3;
//!
//! let mut scene = Scene::new("example");
//! let cube = scene.add_mesh(shapes::cube(Vec3::splat(-1.0), Vec3::ONE));
//! scene.add_primitive(&cube, &Transform::default());
//! scene.add_primitive(&cube, &Transform::from_translation(Vec3::new(3.0, 0.0, 0.0)));
//!
//! assert_eq!(scene.total_triangle_count(), 24);
//! ```

pub mod error;
pub mod geometry;
pub mod mesh;
pub mod scene;
pub mod shapes;

// Re-export commonly used types
pub use error::{MeshError, MeshResult};
pub use geometry::DifferentialGeometry;
pub use mesh::Mesh;
pub use scene::{MeshHandle, MeshId, Primitive, Scene, Transform};
