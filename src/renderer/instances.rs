//! Mesh instance registry
//!
//! Each mesh keeps a table of GPU-visible instance data and, at the same
//! index, the entity that registered that instance and the material it is
//! drawn with. The three columns always move together.
//!
//! # GPU sync
//!
//! Every mutation sets `requires_gpu_update` and bumps a revision counter.
//! Once per frame the frame driver calls [`InstanceTable::prepare_upload`]
//! for the current frame slot, after that slot's fence wait. The call
//! clears the dirty flag and, if the slot's buffer is older than the table,
//! stages exactly the live instances, grouped by material, for upload.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use smallvec::SmallVec;
use thiserror::Error;

use super::material::MaterialId;
use crate::entity::EntityHandle;
use crate::memory::{ChunkedArray, FrameArena};

/// Default per-mesh instance limit
pub const DEFAULT_MAX_INSTANCES: usize = 1_000;

const INSTANCES_PER_CHUNK: usize = 256;

/// Per-instance vertex data
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstancedData {
    pub model: [[f32; 4]; 4],
}

impl InstancedData {
    pub fn from_matrix(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    /// Instance buffer layout, locations 3 to 6
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstancedData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Instance registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("mesh instance table full ({max_instances} instances)")]
    Full { max_instances: usize },
    #[error("no mesh with id {0}")]
    UnknownMesh(u32),
}

/// One instanced draw: a contiguous run of staged instances sharing a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBatch {
    pub material: MaterialId,
    pub first_instance: u32,
    pub instance_count: u32,
}

/// Instance table of a single mesh.
#[derive(Debug)]
pub struct InstanceTable {
    instance_data: ChunkedArray<InstancedData>,
    registered_entities: ChunkedArray<EntityHandle>,
    materials: ChunkedArray<MaterialId>,
    max_instances: usize,
    requires_gpu_update: bool,
    /// Bumped on every mutation
    revision: u64,
    /// Revision each frame slot's GPU buffer was last written with
    uploaded: SmallVec<[Option<u64>; 3]>,
    /// Draw ranges matching the layout of the last staged upload
    batches: SmallVec<[DrawBatch; 4]>,
}

impl InstanceTable {
    #[must_use]
    pub fn new(max_instances: usize, frames_in_flight: usize) -> Self {
        Self {
            instance_data: ChunkedArray::new(INSTANCES_PER_CHUNK),
            registered_entities: ChunkedArray::new(INSTANCES_PER_CHUNK),
            materials: ChunkedArray::new(INSTANCES_PER_CHUNK),
            max_instances,
            requires_gpu_update: false,
            revision: 0,
            uploaded: smallvec::smallvec![None; frames_in_flight.max(1)],
            batches: SmallVec::new(),
        }
    }

    /// Register an instance for `entity`. Returns its index.
    pub fn add(
        &mut self,
        entity: EntityHandle,
        model: Mat4,
        material: MaterialId,
    ) -> Result<usize, InstanceError> {
        if self.len() >= self.max_instances {
            log::error!(
                "cannot add instance for {entity}: table full ({} instances)",
                self.max_instances
            );
            return Err(InstanceError::Full {
                max_instances: self.max_instances,
            });
        }

        let index = self.instance_data.push_back(InstancedData::from_matrix(model));
        self.registered_entities.push_back(entity);
        self.materials.push_back(material);
        self.mark_dirty();
        Ok(index)
    }

    /// Remove instance `index` by moving the last instance into its place.
    ///
    /// Indices held outside the table are invalid after this call.
    pub fn remove_at(&mut self, index: usize) -> Option<EntityHandle> {
        if index >= self.len() {
            return None;
        }
        self.instance_data.swap_remove(index);
        self.materials.swap_remove(index);
        let entity = self.registered_entities.swap_remove(index);
        self.mark_dirty();
        Some(entity)
    }

    /// Remove the instance registered by `entity`.
    pub fn remove_entity(&mut self, entity: EntityHandle) -> bool {
        self.find(entity)
            .and_then(|index| self.remove_at(index))
            .is_some()
    }

    /// Index of the instance registered by `entity`
    #[must_use]
    pub fn find(&self, entity: EntityHandle) -> Option<usize> {
        self.registered_entities.position(|&handle| handle == entity)
    }

    /// Replace the model matrix of `entity`'s instance.
    pub fn set_transform(&mut self, entity: EntityHandle, model: Mat4) -> bool {
        let Some(index) = self.find(entity) else {
            return false;
        };
        self.instance_data[index] = InstancedData::from_matrix(model);
        self.mark_dirty();
        true
    }

    /// Change the material `entity`'s instance is drawn with.
    pub fn set_material(&mut self, entity: EntityHandle, material: MaterialId) -> bool {
        let Some(index) = self.find(entity) else {
            return false;
        };
        self.materials[index] = material;
        self.mark_dirty();
        true
    }

    /// Drop every instance. Storage is kept.
    pub fn clear(&mut self) {
        self.instance_data.clear();
        self.registered_entities.clear();
        self.materials.clear();
        self.mark_dirty();
    }

    /// Stage this table for the GPU buffer of `slot`.
    ///
    /// Must only be called once the slot's previous submission has finished.
    /// Clears the dirty flag unless `slot` is out of range. Returns `None`
    /// when there is nothing to copy: the table is empty, the slot does not
    /// exist, or the slot's buffer already holds this revision.
    pub fn prepare_upload<'a>(
        &mut self,
        slot: usize,
        arena: &'a mut FrameArena,
    ) -> Option<&'a [InstancedData]> {
        let slots = self.uploaded.len();
        let Some(slot_revision) = self.uploaded.get_mut(slot) else {
            log::error!("upload to frame slot {slot} ignored, table has {slots}");
            return None;
        };
        self.requires_gpu_update = false;
        if *slot_revision == Some(self.revision) {
            return None;
        }
        *slot_revision = Some(self.revision);

        let count = self.len();
        if count == 0 {
            self.batches.clear();
            return None;
        }

        let staged = arena.alloc_slice::<InstancedData>(count);
        self.batches = group_by_material(&self.materials);

        let mut cursors: SmallVec<[u32; 4]> =
            self.batches.iter().map(|batch| batch.first_instance).collect();
        for (data, material) in self.instance_data.iter().zip(self.materials.iter()) {
            let group = self
                .batches
                .iter()
                .position(|batch| batch.material == *material)
                .unwrap_or_default();
            staged[cursors[group] as usize] = *data;
            cursors[group] += 1;
        }

        log::trace!(
            "staged {} instances in {} batches for slot {}",
            count,
            self.batches.len(),
            slot
        );
        Some(staged)
    }

    /// Draw ranges for the last staged layout.
    #[must_use]
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.instance_data.len()
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.instance_data.is_empty()
    }

    #[must_use]
    #[inline]
    pub const fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Whether CPU data changed since the last sync
    #[must_use]
    #[inline]
    pub const fn requires_gpu_update(&self) -> bool {
        self.requires_gpu_update
    }

    /// Chunks backing the instance data column
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.instance_data.chunk_count()
    }

    #[must_use]
    pub fn instance(&self, index: usize) -> Option<&InstancedData> {
        self.instance_data.get(index)
    }

    #[must_use]
    pub fn entity(&self, index: usize) -> Option<EntityHandle> {
        self.registered_entities.get(index).copied()
    }

    #[must_use]
    pub fn material(&self, index: usize) -> Option<MaterialId> {
        self.materials.get(index).copied()
    }

    /// Registered entities in instance order
    pub fn entities(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.registered_entities.iter().copied()
    }

    fn mark_dirty(&mut self) {
        self.requires_gpu_update = true;
        self.revision += 1;
    }
}

/// Contiguous ranges per material, in order of first appearance.
fn group_by_material(materials: &ChunkedArray<MaterialId>) -> SmallVec<[DrawBatch; 4]> {
    let mut batches: SmallVec<[DrawBatch; 4]> = SmallVec::new();
    for &material in materials.iter() {
        match batches.iter_mut().find(|batch| batch.material == material) {
            Some(batch) => batch.instance_count += 1,
            None => batches.push(DrawBatch {
                material,
                first_instance: 0,
                instance_count: 1,
            }),
        }
    }

    let mut first = 0;
    for batch in &mut batches {
        batch.first_instance = first;
        first += batch.instance_count;
    }
    batches
}
