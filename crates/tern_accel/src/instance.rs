//! Placements of shared-mesh subtrees.

use tern_math::{Aabb, DMat4, Ray, TransformExt};

use crate::arena::NodeId;

/// One primitive that reuses a shared-mesh subtree under its own transform.
#[derive(Clone, Debug)]
pub struct Instance {
    /// Root of the subtree built over the mesh in mesh space
    pub root: NodeId,
    /// Index of the owning primitive
    pub primitive: u32,
    pub to_world: DMat4,
    pub to_local: DMat4,
    /// World-space box of the subtree's 8 transformed corners
    pub world_bbox: Aabb,
    /// Triangles in the subtree, the instance's weight in split costs
    pub triangle_count: u32,
}

impl Instance {
    pub fn new(root: NodeId, primitive: u32, to_world: DMat4, local_bbox: &Aabb, triangle_count: u32) -> Self {
        Self {
            root,
            primitive,
            to_world,
            to_local: to_world.inverse(),
            world_bbox: to_world.transform_aabb(local_bbox),
            triangle_count,
        }
    }

    /// Move a world ray into the subtree's space.
    ///
    /// The direction keeps the length the transform gives it, so hit
    /// distances are the same in both spaces.
    #[inline]
    pub fn local_ray(&self, ray: &Ray) -> Ray {
        self.to_local.transform_ray(ray)
    }
}
