//! Entity types and the static type-info table

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entities::{
    FloorEntity, LightSourceEntity, PlayerEntity, PropEntity, TriggerEntity, WallEntity,
};

/// Tag identifying which per-type buffer an entity lives in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum EntityType {
    #[default]
    Player,
    Floor,
    Wall,
    LightSource,
    Prop,
    Trigger,
}

impl EntityType {
    /// Number of entity types
    pub const COUNT: usize = 6;

    /// Every type, in table order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Player,
        Self::Floor,
        Self::Wall,
        Self::LightSource,
        Self::Prop,
        Self::Trigger,
    ];

    /// Row of this type in [`ENTITY_TYPE_INFO`]
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Static info for this type
    #[must_use]
    #[inline]
    pub fn info(self) -> &'static EntityTypeInfo {
        &ENTITY_TYPE_INFO[self.index()]
    }

    /// Name used in level files and logs
    #[must_use]
    #[inline]
    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }

    /// Look a type up by its display name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.display_name() == name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One row of the entity type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTypeInfo {
    pub kind: EntityType,
    /// Size of the concrete entity struct in bytes
    pub struct_size: usize,
    /// Per-type buffer capacity used when none is configured
    pub default_capacity: usize,
    pub display_name: &'static str,
}

/// Static type table, indexed by [`EntityType::index`].
///
/// Adding a type means adding an enum variant, a concrete struct and a row
/// here, in the same position.
pub static ENTITY_TYPE_INFO: [EntityTypeInfo; EntityType::COUNT] = [
    EntityTypeInfo {
        kind: EntityType::Player,
        struct_size: size_of::<PlayerEntity>(),
        default_capacity: 16,
        display_name: "Player",
    },
    EntityTypeInfo {
        kind: EntityType::Floor,
        struct_size: size_of::<FloorEntity>(),
        default_capacity: 1_024,
        display_name: "Floor",
    },
    EntityTypeInfo {
        kind: EntityType::Wall,
        struct_size: size_of::<WallEntity>(),
        default_capacity: 10_000,
        display_name: "Wall",
    },
    EntityTypeInfo {
        kind: EntityType::LightSource,
        struct_size: size_of::<LightSourceEntity>(),
        default_capacity: 256,
        display_name: "LightSource",
    },
    EntityTypeInfo {
        kind: EntityType::Prop,
        struct_size: size_of::<PropEntity>(),
        default_capacity: 4_096,
        display_name: "Prop",
    },
    EntityTypeInfo {
        kind: EntityType::Trigger,
        struct_size: size_of::<TriggerEntity>(),
        default_capacity: 1_024,
        display_name: "Trigger",
    },
];
