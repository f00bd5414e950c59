use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::ResourceIdentifier;

/// Lifecycle stage of a resource in a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    /// Configuration was found and its metadata read.
    Scanned,
    /// Dependencies were resolved and a builder is available.
    Prepared,
    /// The resource object exists but has not been initialized.
    Built,
    /// The resource is live.
    Initialized,
    /// Explicitly switched off; never built.
    Deactivated,
    /// Building or initializing failed, or a dependency went away.
    Error,
}

/// Registry of resource states owned by whoever drives the workspace.
///
/// This is a plain value: construct one per workspace and pass it by
/// reference to the code that needs to read or update states.
#[derive(Debug, Clone, Default)]
pub struct ResourceStates {
    states: HashMap<ResourceIdentifier, ResourceState>,
}

impl ResourceStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ResourceIdentifier) -> Option<ResourceState> {
        self.states.get(id).copied()
    }

    /// Records `state` for `id`, returning the previous state.
    pub fn set(&mut self, id: ResourceIdentifier, state: ResourceState) -> Option<ResourceState> {
        let previous = self.states.insert(id.clone(), state);
        tracing::trace!(%id, ?previous, ?state, "resource state changed");
        previous
    }

    pub fn remove(&mut self, id: &ResourceIdentifier) -> Option<ResourceState> {
        self.states.remove(id)
    }

    /// Identifiers currently in `state`, in no particular order.
    pub fn with_state(&self, state: ResourceState) -> impl Iterator<Item = &ResourceIdentifier> {
        self.states
            .iter()
            .filter(move |(_, s)| **s == state)
            .map(|(id, _)| id)
    }

    /// Whether every one of `ids` is initialized. A resource may only be built
    /// once all of its dependencies pass this check; prepared or built
    /// dependencies are not live yet.
    pub fn all_initialized<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ResourceIdentifier>,
    ) -> bool {
        ids.into_iter().all(|id| self.get(id) == Some(ResourceState::Initialized))
    }
}
