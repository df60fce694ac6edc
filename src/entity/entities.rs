//! Concrete entity structs
//!
//! Entities are plain data, polymorphic only through their [`EntityType`]
//! tag. Each one owns its transform and refers to a mesh and a material by
//! id; the libraries that own those resources resolve the ids at use time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::store::{TypeBuffer, TypeBuffers};
use super::{EntityType, Transform};
use crate::renderer::{MaterialId, MeshId};

/// State shared by every entity type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityCore {
    pub transform: Transform,
    /// Mesh drawn for this entity, if any
    pub mesh: Option<MeshId>,
    /// Material the entity's instance is drawn with
    pub material: Option<MaterialId>,
    /// Cleared when the editor deletes the entity
    pub active: bool,
}

impl Default for EntityCore {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            mesh: None,
            material: None,
            active: true,
        }
    }
}

/// Type-erased view over any concrete entity.
pub trait EntityData {
    /// Tag of the concrete type
    fn kind(&self) -> EntityType;
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    fn transform(&self) -> &Transform {
        &self.core().transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.core_mut().transform
    }

    fn mesh(&self) -> Option<MeshId> {
        self.core().mesh
    }

    fn material(&self) -> Option<MaterialId> {
        self.core().material
    }

    fn is_active(&self) -> bool {
        self.core().active
    }
}

/// A concrete entity type with its own buffer in the store.
pub trait Entity: EntityData + Default + 'static {
    const KIND: EntityType;

    #[doc(hidden)]
    fn buffer(buffers: &TypeBuffers) -> &TypeBuffer<Self>;
    #[doc(hidden)]
    fn buffer_mut(buffers: &mut TypeBuffers) -> &mut TypeBuffer<Self>;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl EntityData for $ty {
            fn kind(&self) -> EntityType {
                EntityType::$kind
            }

            fn core(&self) -> &EntityCore {
                &self.core
            }

            fn core_mut(&mut self) -> &mut EntityCore {
                &mut self.core
            }
        }

        impl Entity for $ty {
            const KIND: EntityType = EntityType::$kind;

            fn buffer(buffers: &TypeBuffers) -> &TypeBuffer<Self> {
                &buffers.$field
            }

            fn buffer_mut(buffers: &mut TypeBuffers) -> &mut TypeBuffer<Self> {
                &mut buffers.$field
            }
        }
    };
}

/// The player avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerEntity {
    pub core: EntityCore,
    pub move_speed: f32,
}

impl Default for PlayerEntity {
    fn default() -> Self {
        Self {
            core: EntityCore::default(),
            move_speed: 5.0,
        }
    }
}

/// Ground tile.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloorEntity {
    pub core: EntityCore,
}

/// Placeable wall block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WallEntity {
    pub core: EntityCore,
}

/// Point light with an optional visual marker mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSourceEntity {
    pub core: EntityCore,
    pub color: Vec3,
    pub intensity: f32,
    /// Distance at which the light's contribution fades out
    pub range: f32,
}

impl Default for LightSourceEntity {
    fn default() -> Self {
        Self {
            core: EntityCore::default(),
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
        }
    }
}

/// Decorative or collidable scenery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropEntity {
    pub core: EntityCore,
    pub is_static: bool,
    pub casts_shadows: bool,
    pub collision_radius: f32,
}

impl Default for PropEntity {
    fn default() -> Self {
        Self {
            core: EntityCore::default(),
            is_static: true,
            casts_shadows: true,
            collision_radius: 1.0,
        }
    }
}

/// Volume shape of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerShape {
    #[default]
    Box,
    Sphere,
    Cylinder,
}

/// Invisible gameplay volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerEntity {
    pub core: EntityCore,
    pub shape: TriggerShape,
    pub trigger_id: u32,
    pub is_visible: bool,
    /// Color used when the editor draws the volume
    pub debug_color: Vec3,
}

impl Default for TriggerEntity {
    fn default() -> Self {
        Self {
            core: EntityCore::default(),
            shape: TriggerShape::Box,
            trigger_id: 0,
            is_visible: false,
            debug_color: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

impl_entity!(PlayerEntity, Player, players);
impl_entity!(FloorEntity, Floor, floors);
impl_entity!(WallEntity, Wall, walls);
impl_entity!(LightSourceEntity, LightSource, light_sources);
impl_entity!(PropEntity, Prop, props);
impl_entity!(TriggerEntity, Trigger, triggers);
