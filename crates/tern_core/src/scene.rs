//! Scene registration types.
//!
//! Meshes are registered once and referenced through a [`MeshHandle`].
//! Every placement of a mesh in the world is a [`Primitive`]; primitives that
//! share a handle are instanced by the accelerator.

use std::fmt;
use std::sync::Arc;

use tern_math::{Aabb, DMat4, Quat, TransformExt, Vec3};

use crate::mesh::Mesh;

/// Stable identity of a registered mesh.
///
/// Assigned in registration order, so grouping by `MeshId` is deterministic
/// across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(pub u32);

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// Shared reference to registered mesh geometry.
#[derive(Clone, Debug)]
pub struct MeshHandle {
    pub id: MeshId,
    pub mesh: Arc<Mesh>,
}

impl MeshHandle {
    /// Create a handle outside of a [`Scene`].
    ///
    /// Callers are responsible for keeping ids unique per mesh.
    pub fn new(id: MeshId, mesh: Arc<Mesh>) -> Self {
        Self { id, mesh }
    }
}

/// Transform components that can be composed into a matrix.
#[derive(Clone, Debug)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,

    /// Rotation (as quaternion)
    pub rotation: Quat,

    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Create a new transform from a 4x4 matrix.
    ///
    /// Decomposes the matrix into translation, rotation, and scale in
    /// double precision, narrowing only the parts.
    pub fn from_matrix(matrix: DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation: translation.as_vec3(),
            rotation: rotation.as_quat(),
            scale: scale.as_vec3(),
        }
    }

    /// Convert to a 4x4 double precision matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(
            self.scale.as_dvec3(),
            self.rotation.as_dquat(),
            self.translation.as_dvec3(),
        )
    }
}

/// One placement of a mesh in the world.
#[derive(Clone, Debug)]
pub struct Primitive {
    pub mesh: MeshHandle,
    pub mesh_to_world: DMat4,
    /// Caller-assigned identifier, reported back by hits.
    pub id: usize,
}

impl Primitive {
    pub fn new(mesh: MeshHandle, mesh_to_world: DMat4, id: usize) -> Self {
        Self {
            mesh,
            mesh_to_world,
            id,
        }
    }

    /// World-space bounds of the placed mesh.
    pub fn world_bounds(&self) -> Aabb {
        self.mesh_to_world.transform_aabb(&self.mesh.mesh.bounds)
    }
}

/// A collection of registered meshes and their placements.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Registered meshes, indexed by `MeshId`
    pub meshes: Vec<MeshHandle>,

    /// Mesh placements
    pub primitives: Vec<Primitive>,

    /// Scene name
    pub name: String,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Register a mesh and return its handle.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        let id = MeshId(self.meshes.len() as u32);
        let handle = MeshHandle::new(id, Arc::new(mesh));
        self.meshes.push(handle.clone());
        handle
    }

    /// Place a registered mesh and return the new primitive's id.
    pub fn add_primitive(&mut self, mesh: &MeshHandle, transform: &Transform) -> usize {
        self.add_primitive_with_matrix(mesh, transform.to_matrix())
    }

    /// Place a registered mesh with an arbitrary affine matrix.
    pub fn add_primitive_with_matrix(&mut self, mesh: &MeshHandle, mesh_to_world: DMat4) -> usize {
        let id = self.primitives.len();
        self.primitives.push(Primitive::new(mesh.clone(), mesh_to_world, id));
        id
    }

    /// Look up a registered mesh.
    pub fn mesh(&self, id: MeshId) -> Option<&MeshHandle> {
        self.meshes.get(id.0 as usize)
    }

    /// Get total triangle count across all placements.
    pub fn total_triangle_count(&self) -> usize {
        self.primitives
            .iter()
            .map(|primitive| primitive.mesh.mesh.triangle_count())
            .sum()
    }

    /// Get primitive count.
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Get registered mesh count.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Compute the world-space bounding box of all placements.
    pub fn world_bounds(&self) -> Aabb {
        self.primitives
            .iter()
            .fold(Aabb::EMPTY, |bounds, primitive| {
                Aabb::surrounding(&bounds, &primitive.world_bounds())
            })
    }
}
