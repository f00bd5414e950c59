use std::sync::Arc;

use indexmap::IndexSet;

use crate::graph::{ResourceIdentifier, ResourceMetadata};

/// A single vertex of the [`ResourceGraph`](crate::ResourceGraph).
///
/// Both edge sets keep the order in which edges were established, which is
/// what traversal tie-breaking and the direct-neighbour queries rely on.
#[derive(Debug)]
pub struct ResourceNode<M> {
    pub(crate) metadata: Arc<M>,
    /// Resources this node depends on.
    pub(crate) dependencies: IndexSet<ResourceIdentifier>,
    /// Resources that depend on this node.
    pub(crate) dependents: IndexSet<ResourceIdentifier>,
}

impl<M: ResourceMetadata> ResourceNode<M> {
    pub(crate) fn new(metadata: Arc<M>) -> Self {
        Self {
            metadata,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        }
    }

    pub fn identifier(&self) -> &ResourceIdentifier {
        self.metadata.identifier()
    }

    pub fn metadata(&self) -> &Arc<M> {
        &self.metadata
    }

    pub fn dependencies(&self) -> impl ExactSizeIterator<Item = &ResourceIdentifier> {
        self.dependencies.iter()
    }

    pub fn dependents(&self) -> impl ExactSizeIterator<Item = &ResourceIdentifier> {
        self.dependents.iter()
    }
}
