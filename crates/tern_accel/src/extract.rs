//! Grouping of primitives by the mesh they place.

use std::collections::BTreeMap;
use std::sync::Arc;

use tern_core::{Mesh, MeshId, Primitive};

/// Primitives that place the same registered mesh.
#[derive(Debug)]
pub(crate) struct MeshGroup {
    pub id: MeshId,
    pub mesh: Arc<Mesh>,
    /// Indices into the primitive list, ascending
    pub primitives: Vec<u32>,
}

impl MeshGroup {
    /// More than one placement: the mesh gets its own subtree and is
    /// instanced.
    pub fn is_shared(&self) -> bool {
        self.primitives.len() > 1
    }
}

/// Group primitives by mesh handle, in ascending `MeshId` order.
///
/// Meshes without triangles are dropped.
pub(crate) fn group_by_mesh(primitives: &[Primitive]) -> Vec<MeshGroup> {
    let mut groups: BTreeMap<MeshId, MeshGroup> = BTreeMap::new();

    for (index, primitive) in primitives.iter().enumerate() {
        let handle = &primitive.mesh;
        groups
            .entry(handle.id)
            .or_insert_with(|| MeshGroup {
                id: handle.id,
                mesh: Arc::clone(&handle.mesh),
                primitives: Vec::new(),
            })
            .primitives
            .push(index as u32);
    }

    groups
        .into_values()
        .filter(|group| group.mesh.triangle_count() > 0)
        .collect()
}
