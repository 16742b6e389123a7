//! Triangle records in structure-of-arrays layout.

use tern_core::Mesh;
use tern_math::{Aabb, DMat4, Vec3};

/// Owning-primitive index of triangles that belong to a shared-mesh subtree.
/// Their primitive is resolved through the instance that reached them.
pub const SHARED_PRIMITIVE: u32 = u32::MAX;

/// Triangle geometry plus the parallel per-triangle bookkeeping arrays.
///
/// The arrays always have equal length, and the build only ever reorders
/// them through [`TriangleStore::swap`].
#[derive(Clone, Debug, Default)]
pub struct TriangleStore {
    vertices: Vec<[Vec3; 3]>,
    primitives: Vec<u32>,
    local_indices: Vec<u32>,
}

impl TriangleStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            primitives: Vec::with_capacity(capacity),
            local_indices: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, vertices: [Vec3; 3], primitive: u32, local_index: u32) {
        self.vertices.push(vertices);
        self.primitives.push(primitive);
        self.local_indices.push(local_index);
    }

    /// Append every triangle of `mesh` in mesh space, for a shared subtree.
    pub fn push_local(&mut self, mesh: &Mesh) {
        for i in 0..mesh.triangle_count() {
            self.push(mesh.triangle_vertices(i), SHARED_PRIMITIVE, i as u32);
        }
    }

    /// Append every triangle of `mesh` moved into world space.
    pub fn push_world(&mut self, mesh: &Mesh, mesh_to_world: &DMat4, primitive: u32) {
        for i in 0..mesh.triangle_count() {
            self.push(mesh.triangle_vertices_world(i, mesh_to_world), primitive, i as u32);
        }
    }

    #[inline]
    pub fn vertices(&self, index: usize) -> &[Vec3; 3] {
        &self.vertices[index]
    }

    #[inline]
    pub fn primitive(&self, index: usize) -> u32 {
        self.primitives[index]
    }

    #[inline]
    pub fn local_index(&self, index: usize) -> u32 {
        self.local_indices[index]
    }

    /// Padded bounding box of a triangle.
    pub fn bbox(&self, index: usize) -> Aabb {
        Aabb::around_triangle(&self.vertices[index])
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.vertices.swap(a, b);
        self.primitives.swap(a, b);
        self.local_indices.swap(a, b);
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.vertices.shrink_to_fit();
        self.primitives.shrink_to_fit();
        self.local_indices.shrink_to_fit();
    }
}
