//! Type-safe identifier for scenario entities.
//!
//! Entities are identified by their declaration order in the scenario
//! document: the first declared object gets id 0, the next id 1, and so
//! on. The id is stable for the lifetime of the scenario and doubles as
//! the index into the engine's entity table, so cross-references between
//! conditions, actions, and entities never need name lookups after load.

use serde::{Deserialize, Serialize};

/// Identifier for a scenario entity, assigned in declaration order.
///
/// Ordering follows declaration order, which makes iteration over
/// id-keyed collections deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Wrap a raw declaration index as an entity id.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the raw declaration index.
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Return the id as a `usize` for direct table indexing.
    ///
    /// Saturates on platforms where `usize` is narrower than `u32`.
    pub fn as_usize(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}
