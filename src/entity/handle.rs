//! Generation-stamped entity handles

use std::fmt;

use serde::{Deserialize, Serialize};

use super::EntityType;

/// Weak reference to an entity slot.
///
/// A handle stays valid only while the slot it names still carries the same
/// generation and type. Once the slot is freed or recycled, every copy of the
/// old handle resolves to not-found. Generations start at 1, so the all-zero
/// handle ([`EntityHandle::INVALID`]) never names a live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle {
    slot_index: u32,
    generation: u32,
    kind: EntityType,
}

impl EntityHandle {
    /// Handle that never resolves.
    pub const INVALID: Self = Self {
        slot_index: 0,
        generation: 0,
        kind: EntityType::Player,
    };

    pub(crate) const fn new(slot_index: u32, generation: u32, kind: EntityType) -> Self {
        Self {
            slot_index,
            generation,
            kind,
        }
    }

    /// Slot this handle points at
    #[must_use]
    #[inline]
    pub const fn slot_index(self) -> u32 {
        self.slot_index
    }

    /// Generation of the slot when the handle was issued
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Entity type the handle was issued for
    #[must_use]
    #[inline]
    pub const fn kind(self) -> EntityType {
        self.kind
    }

    /// Whether the handle was ever issued by a store.
    ///
    /// This does not say the entity is still alive; ask the store for that.
    #[must_use]
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.generation != 0
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}v{}", self.kind, self.slot_index, self.generation)
    }
}
