//! Entities
//!
//! Flat, type-segmented entity storage addressed through generation-checked
//! handles.

mod entities;
mod handle;
mod kinds;
mod store;
mod transform;

pub use entities::{
    Entity, EntityCore, EntityData, FloorEntity, LightSourceEntity, PlayerEntity, PropEntity,
    TriggerEntity, TriggerShape, WallEntity,
};
pub use handle::EntityHandle;
pub use kinds::{ENTITY_TYPE_INFO, EntityType, EntityTypeInfo};
pub use store::{DEFAULT_ENTITY_CAPACITY, EntityError, EntityStore, TypeBuffer};
pub use transform::Transform;
