//! Entity slot allocator
//!
//! Type-segmented, generation-stamped slot storage.
//!
//! # Layout
//!
//! - One [`EntityInfo`] per slot, up to `entity_capacity` slots. A slot
//!   records its generation, its type and where its data lives in that
//!   type's buffer.
//! - One fixed-capacity [`TypeBuffer`] per [`EntityType`]. Buffers never
//!   grow; a full buffer rejects new entities of that type.
//! - One free list per type. Freed slots keep their type and buffer
//!   position, so recycling a slot reuses both.
//!
//! Every lookup re-checks generation, type and liveness, so a handle kept
//! across a free or a recycle resolves to `None` instead of aliasing the
//! new occupant.

use thiserror::Error;

use super::entities::{
    Entity, EntityData, FloorEntity, LightSourceEntity, PlayerEntity, PropEntity,
    TriggerEntity, WallEntity,
};
use super::{EntityHandle, EntityType};

/// Default number of entity slots
pub const DEFAULT_ENTITY_CAPACITY: usize = 100_000;

/// Entity allocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("entity slots exhausted (capacity {capacity})")]
    SlotsExhausted { capacity: usize },
    #[error("{kind} buffer full (capacity {capacity})")]
    TypeBufferFull { kind: EntityType, capacity: usize },
    #[error("stale or unknown entity handle {0}")]
    StaleHandle(EntityHandle),
}

// ============================================================================
// Slot Info
// ============================================================================

/// Bookkeeping for one slot.
#[derive(Debug, Clone, Copy)]
struct EntityInfo {
    generation: u32,
    index_in_type_buffer: u32,
    kind: EntityType,
    live: bool,
}

// ============================================================================
// Type Buffers
// ============================================================================

/// Fixed-capacity storage for one concrete entity type.
#[derive(Debug)]
pub struct TypeBuffer<T> {
    entities: Vec<T>,
    capacity: usize,
}

impl<T: Default> TypeBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a default entity, returning its position.
    fn push_default(&mut self) -> Option<u32> {
        if self.entities.len() >= self.capacity {
            return None;
        }
        self.entities.push(T::default());
        Some((self.entities.len() - 1) as u32)
    }

    fn reset(&mut self, index: u32) {
        self.entities[index as usize] = T::default();
    }
}

impl<T> TypeBuffer<T> {
    /// Entities ever placed in this buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One buffer per entity type.
#[derive(Debug)]
pub struct TypeBuffers {
    pub(super) players: TypeBuffer<PlayerEntity>,
    pub(super) floors: TypeBuffer<FloorEntity>,
    pub(super) walls: TypeBuffer<WallEntity>,
    pub(super) light_sources: TypeBuffer<LightSourceEntity>,
    pub(super) props: TypeBuffer<PropEntity>,
    pub(super) triggers: TypeBuffer<TriggerEntity>,
}

impl TypeBuffers {
    fn new(capacities: [usize; EntityType::COUNT]) -> Self {
        let cap = |kind: EntityType| capacities[kind.index()];
        Self {
            players: TypeBuffer::new(cap(EntityType::Player)),
            floors: TypeBuffer::new(cap(EntityType::Floor)),
            walls: TypeBuffer::new(cap(EntityType::Wall)),
            light_sources: TypeBuffer::new(cap(EntityType::LightSource)),
            props: TypeBuffer::new(cap(EntityType::Prop)),
            triggers: TypeBuffer::new(cap(EntityType::Trigger)),
        }
    }

    fn push_default(&mut self, kind: EntityType) -> Option<u32> {
        match kind {
            EntityType::Player => self.players.push_default(),
            EntityType::Floor => self.floors.push_default(),
            EntityType::Wall => self.walls.push_default(),
            EntityType::LightSource => self.light_sources.push_default(),
            EntityType::Prop => self.props.push_default(),
            EntityType::Trigger => self.triggers.push_default(),
        }
    }

    fn reset(&mut self, kind: EntityType, index: u32) {
        match kind {
            EntityType::Player => self.players.reset(index),
            EntityType::Floor => self.floors.reset(index),
            EntityType::Wall => self.walls.reset(index),
            EntityType::LightSource => self.light_sources.reset(index),
            EntityType::Prop => self.props.reset(index),
            EntityType::Trigger => self.triggers.reset(index),
        }
    }

    fn len(&self, kind: EntityType) -> usize {
        match kind {
            EntityType::Player => self.players.len(),
            EntityType::Floor => self.floors.len(),
            EntityType::Wall => self.walls.len(),
            EntityType::LightSource => self.light_sources.len(),
            EntityType::Prop => self.props.len(),
            EntityType::Trigger => self.triggers.len(),
        }
    }

    fn capacity(&self, kind: EntityType) -> usize {
        match kind {
            EntityType::Player => self.players.capacity(),
            EntityType::Floor => self.floors.capacity(),
            EntityType::Wall => self.walls.capacity(),
            EntityType::LightSource => self.light_sources.capacity(),
            EntityType::Prop => self.props.capacity(),
            EntityType::Trigger => self.triggers.capacity(),
        }
    }

    fn get_dyn(&self, kind: EntityType, index: u32) -> Option<&dyn EntityData> {
        let index = index as usize;
        match kind {
            EntityType::Player => self.players.entities.get(index).map(|e| e as &dyn EntityData),
            EntityType::Floor => self.floors.entities.get(index).map(|e| e as &dyn EntityData),
            EntityType::Wall => self.walls.entities.get(index).map(|e| e as &dyn EntityData),
            EntityType::LightSource => self
                .light_sources
                .entities
                .get(index)
                .map(|e| e as &dyn EntityData),
            EntityType::Prop => self.props.entities.get(index).map(|e| e as &dyn EntityData),
            EntityType::Trigger => self.triggers.entities.get(index).map(|e| e as &dyn EntityData),
        }
    }

    fn get_dyn_mut(&mut self, kind: EntityType, index: u32) -> Option<&mut dyn EntityData> {
        let index = index as usize;
        match kind {
            EntityType::Player => self
                .players
                .entities
                .get_mut(index)
                .map(|e| e as &mut dyn EntityData),
            EntityType::Floor => self
                .floors
                .entities
                .get_mut(index)
                .map(|e| e as &mut dyn EntityData),
            EntityType::Wall => self
                .walls
                .entities
                .get_mut(index)
                .map(|e| e as &mut dyn EntityData),
            EntityType::LightSource => self
                .light_sources
                .entities
                .get_mut(index)
                .map(|e| e as &mut dyn EntityData),
            EntityType::Prop => self
                .props
                .entities
                .get_mut(index)
                .map(|e| e as &mut dyn EntityData),
            EntityType::Trigger => self
                .triggers
                .entities
                .get_mut(index)
                .map(|e| e as &mut dyn EntityData),
        }
    }
}

// ============================================================================
// Entity Store
// ============================================================================

/// Generational slot allocator over per-type entity buffers.
#[derive(Debug)]
pub struct EntityStore {
    /// Slots handed out so far; `infos.len()` is the next fresh slot id
    infos: Vec<EntityInfo>,
    entity_capacity: usize,
    free_lists: [Vec<u32>; EntityType::COUNT],
    buffers: TypeBuffers,
    live_count: usize,
}

impl EntityStore {
    /// Create a store using each type's default buffer capacity.
    #[must_use]
    pub fn new(entity_capacity: usize) -> Self {
        Self::with_type_capacities(
            entity_capacity,
            EntityType::ALL.map(|kind| kind.info().default_capacity),
        )
    }

    /// Create a store with explicit per-type buffer capacities.
    #[must_use]
    pub fn with_type_capacities(
        entity_capacity: usize,
        type_capacities: [usize; EntityType::COUNT],
    ) -> Self {
        let entity_capacity = entity_capacity.min(u32::MAX as usize);
        log::debug!(
            "entity store: {} slots, type capacities {:?}",
            entity_capacity,
            type_capacities
        );
        Self {
            infos: Vec::new(),
            entity_capacity,
            free_lists: type_capacities.map(Vec::with_capacity),
            buffers: TypeBuffers::new(type_capacities),
            live_count: 0,
        }
    }

    /// Allocate a default-initialised entity of `kind`.
    ///
    /// Reuses a freed slot of the same type when one exists, otherwise takes
    /// a fresh slot. The slot's generation is bumped either way.
    pub fn add_entity(&mut self, kind: EntityType) -> Result<EntityHandle, EntityError> {
        if let Some(slot_index) = self.free_lists[kind.index()].pop() {
            let info = &mut self.infos[slot_index as usize];
            info.generation = next_generation(info.generation);
            info.live = true;
            self.buffers.reset(kind, info.index_in_type_buffer);
            self.live_count += 1;
            return Ok(EntityHandle::new(slot_index, info.generation, kind));
        }

        if self.infos.len() >= self.entity_capacity {
            log::warn!(
                "cannot add {}: all {} entity slots in use",
                kind,
                self.entity_capacity
            );
            return Err(EntityError::SlotsExhausted {
                capacity: self.entity_capacity,
            });
        }

        let Some(index_in_type_buffer) = self.buffers.push_default(kind) else {
            let capacity = self.buffers.capacity(kind);
            log::warn!("cannot add {kind}: type buffer full ({capacity})");
            return Err(EntityError::TypeBufferFull { kind, capacity });
        };

        let slot_index = self.infos.len() as u32;
        self.infos.push(EntityInfo {
            generation: 1,
            index_in_type_buffer,
            kind,
            live: true,
        });
        self.live_count += 1;

        Ok(EntityHandle::new(slot_index, 1, kind))
    }

    /// Return an entity's slot to its type's free list.
    ///
    /// Returns `false` for stale or invalid handles.
    pub fn free_entity(&mut self, handle: EntityHandle) -> bool {
        let Some(info) = self.live_info(handle) else {
            log::debug!("free of stale handle {handle} ignored");
            return false;
        };
        let kind = info.kind;

        self.infos[handle.slot_index() as usize].live = false;
        self.free_lists[kind.index()].push(handle.slot_index());
        self.live_count -= 1;
        true
    }

    /// Free every live entity. Generations are kept, so old handles stay stale.
    pub fn clear(&mut self) {
        for (slot_index, info) in self.infos.iter_mut().enumerate().rev() {
            if info.live {
                info.live = false;
                self.free_lists[info.kind.index()].push(slot_index as u32);
            }
        }
        self.live_count = 0;
    }

    /// Resolve a handle to its concrete entity.
    ///
    /// Returns `None` if the handle is stale, freed, or names another type.
    #[must_use]
    pub fn get_entity<T: Entity>(&self, handle: EntityHandle) -> Option<&T> {
        if handle.kind() != T::KIND {
            return None;
        }
        let info = self.live_info(handle)?;
        T::buffer(&self.buffers)
            .entities
            .get(info.index_in_type_buffer as usize)
    }

    /// Resolve a handle to its concrete entity, mutably.
    pub fn get_entity_mut<T: Entity>(&mut self, handle: EntityHandle) -> Option<&mut T> {
        if handle.kind() != T::KIND {
            return None;
        }
        let index = self.live_info(handle)?.index_in_type_buffer as usize;
        T::buffer_mut(&mut self.buffers).entities.get_mut(index)
    }

    /// Resolve a handle without knowing its concrete type.
    #[must_use]
    pub fn get_dyn(&self, handle: EntityHandle) -> Option<&dyn EntityData> {
        let info = self.live_info(handle)?;
        self.buffers.get_dyn(info.kind, info.index_in_type_buffer)
    }

    /// Resolve a handle without knowing its concrete type, mutably.
    pub fn get_dyn_mut(&mut self, handle: EntityHandle) -> Option<&mut dyn EntityData> {
        let info = self.live_info(handle)?;
        self.buffers.get_dyn_mut(info.kind, info.index_in_type_buffer)
    }

    /// Whether `handle` still names a live entity.
    #[must_use]
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.live_info(handle).is_some()
    }

    /// Handles of every live entity, in slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.infos
            .iter()
            .enumerate()
            .filter(|(_, info)| info.live)
            .map(|(slot, info)| EntityHandle::new(slot as u32, info.generation, info.kind))
    }

    /// Number of live entities
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.live_count
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Maximum number of slots
    #[must_use]
    #[inline]
    pub const fn entity_capacity(&self) -> usize {
        self.entity_capacity
    }

    /// Slots handed out at least once
    #[must_use]
    #[inline]
    pub fn slots_used(&self) -> usize {
        self.infos.len()
    }

    /// Positions taken in the buffer for `kind`
    #[must_use]
    pub fn type_len(&self, kind: EntityType) -> usize {
        self.buffers.len(kind)
    }

    /// Buffer capacity for `kind`
    #[must_use]
    pub fn type_capacity(&self, kind: EntityType) -> usize {
        self.buffers.capacity(kind)
    }

    /// Freed slots waiting for reuse by `kind`
    #[must_use]
    pub fn free_count(&self, kind: EntityType) -> usize {
        self.free_lists[kind.index()].len()
    }

    /// Current generation of a slot, live or not
    #[must_use]
    pub fn slot_generation(&self, slot_index: u32) -> Option<u32> {
        self.infos.get(slot_index as usize).map(|info| info.generation)
    }

    fn live_info(&self, handle: EntityHandle) -> Option<EntityInfo> {
        let info = *self.infos.get(handle.slot_index() as usize)?;
        (info.live && info.generation == handle.generation() && info.kind == handle.kind())
            .then_some(info)
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new(DEFAULT_ENTITY_CAPACITY)
    }
}

/// Next generation for a recycled slot. Zero is reserved for invalid handles.
const fn next_generation(generation: u32) -> u32 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

// ============================================================================
// Tests
// ============================================================================
