//! Game world
//!
//! Ties the entity store to the mesh and material libraries: spawning an
//! entity registers its mesh instance, despawning removes it, and moving an
//! entity rewrites the instance matrix.

use glam::{Mat4, Quat, Vec3};

use crate::entity::{EntityError, EntityHandle, EntityStore, EntityType, Transform};
use crate::memory::ChunkedArray;
use crate::renderer::{MaterialId, MaterialLibrary, MaterialType, MeshId, MeshLibrary};

/// Scale of the marker drawn at a light source
pub const LIGHT_MARKER_SCALE: f32 = 0.2;

/// Entities, the libraries they reference and the per-kind game lists
#[derive(Debug)]
pub struct GameWorld {
    pub store: EntityStore,
    pub meshes: MeshLibrary,
    pub materials: MaterialLibrary,
    walls: ChunkedArray<EntityHandle>,
    light_sources: ChunkedArray<EntityHandle>,
}

impl GameWorld {
    pub fn new(store: EntityStore, meshes: MeshLibrary, materials: MaterialLibrary) -> Self {
        Self {
            store,
            meshes,
            materials,
            walls: ChunkedArray::new(64),
            light_sources: ChunkedArray::new(32),
        }
    }

    /// Create an entity and register its mesh instance.
    ///
    /// `mesh`/`material` fall back to the first registered ones when absent
    /// or unknown. Light sources only get a marker instance when a mesh is
    /// given, and never draw with a lighting material.
    pub fn spawn(
        &mut self,
        kind: EntityType,
        transform: Transform,
        mesh: Option<MeshId>,
        material: Option<MaterialId>,
    ) -> Result<EntityHandle, EntityError> {
        let mesh = mesh.filter(|&id| self.meshes.get(id).is_some());
        let (mesh, material) = if kind == EntityType::LightSource {
            let material = material
                .filter(|&id| {
                    self.materials
                        .get(id)
                        .is_some_and(|m| m.kind != MaterialType::Lighting)
                })
                .or_else(|| self.materials.first_non_lighting());
            (mesh, material)
        } else {
            let material = material
                .filter(|&id| self.materials.get(id).is_some())
                .or_else(|| self.materials.first());
            (mesh.or_else(|| self.meshes.first()), material)
        };

        let handle = self.store.add_entity(kind)?;
        if let Some(entity) = self.store.get_dyn_mut(handle) {
            let core = entity.core_mut();
            core.transform = transform;
            core.mesh = mesh;
            core.material = material;
            core.active = true;
        }

        if let (Some(mesh), Some(material)) = (mesh, material) {
            let model = instance_matrix(kind, &transform);
            // A full table leaves the entity alive but invisible.
            let _ = self
                .meshes
                .add_mesh_instance(mesh, handle, model, material);
        }

        match kind {
            EntityType::Wall => {
                self.walls.push_back(handle);
            }
            EntityType::LightSource => {
                self.light_sources.push_back(handle);
            }
            _ => {}
        }

        log::debug!("spawned {handle}");
        Ok(handle)
    }

    /// Remove an entity, its mesh instance and its game list entry.
    ///
    /// Returns `false` for stale handles.
    pub fn despawn(&mut self, handle: EntityHandle) -> bool {
        let Some(entity) = self.store.get_dyn(handle) else {
            log::debug!("despawn of stale handle {handle} ignored");
            return false;
        };

        if let Some(mesh) = entity.mesh().and_then(|id| self.meshes.get_mut(id)) {
            mesh.instances.remove_entity(handle);
        }
        if let Some(list) = self.list_mut(handle.kind()) {
            if let Some(index) = list.position(|&h| h == handle) {
                list.swap_remove(index);
            }
        }
        self.store.free_entity(handle)
    }

    /// Replace an entity's transform and update its instance
    pub fn set_transform(&mut self, handle: EntityHandle, transform: Transform) -> bool {
        let Some(entity) = self.store.get_dyn_mut(handle) else {
            return false;
        };
        *entity.transform_mut() = transform;
        let mesh = entity.mesh();

        if let Some(mesh) = mesh.and_then(|id| self.meshes.get_mut(id)) {
            mesh.instances
                .set_transform(handle, instance_matrix(handle.kind(), &transform));
        }
        true
    }

    /// Current transform of a live entity
    #[must_use]
    pub fn transform(&self, handle: EntityHandle) -> Option<Transform> {
        self.store.get_dyn(handle).map(|entity| *entity.transform())
    }

    /// Drop every entity and instance. Storage is kept.
    pub fn clear(&mut self) {
        self.meshes.clear_all_instances();
        self.walls.clear();
        self.light_sources.clear();
        self.store.clear();
        log::debug!("world cleared");
    }

    /// Wall handles in spawn order, modulo removals
    #[must_use]
    pub fn walls(&self) -> &ChunkedArray<EntityHandle> {
        &self.walls
    }

    #[must_use]
    pub fn light_sources(&self) -> &ChunkedArray<EntityHandle> {
        &self.light_sources
    }

    fn list_mut(&mut self, kind: EntityType) -> Option<&mut ChunkedArray<EntityHandle>> {
        match kind {
            EntityType::Wall => Some(&mut self.walls),
            EntityType::LightSource => Some(&mut self.light_sources),
            _ => None,
        }
    }
}

/// Model matrix drawn for an entity
#[must_use]
pub fn instance_matrix(kind: EntityType, transform: &Transform) -> Mat4 {
    match kind {
        EntityType::LightSource => Mat4::from_scale_rotation_translation(
            Vec3::splat(LIGHT_MARKER_SCALE),
            Quat::IDENTITY,
            transform.position,
        ),
        _ => transform.matrix(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{LightSourceEntity, WallEntity};
    use crate::renderer::Material;

    fn world() -> GameWorld {
        let mut meshes = MeshLibrary::new(100, 2);
        meshes.add_primitives();
        let mut materials = MaterialLibrary::new();
        materials.add_basic_lighting_materials();
        materials.add(Material::unlit("Marker", Vec3::ONE));
        GameWorld::new(EntityStore::new(256), meshes, materials)
    }

    #[test]
    fn test_spawn_registers_instance() {
        let mut world = world();
        let cube = world.meshes.find("Cube").unwrap();
        let at = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));

        let wall = world.spawn(EntityType::Wall, at, None, None).unwrap();

        let entity = world.store.get_entity::<WallEntity>(wall).unwrap();
        assert_eq!(entity.core.mesh, Some(cube));
        assert_eq!(entity.core.material, world.materials.first());
        let instances = &world.meshes.get(cube).unwrap().instances;
        assert_eq!(instances.entity(0), Some(wall));
        assert_eq!(instances.instance(0).unwrap().matrix(), at.matrix());
        assert_eq!(world.walls().len(), 1);
    }

    #[test]
    fn test_light_source_marker() {
        let mut world = world();
        let sphere = world.meshes.find("Sphere").unwrap();
        let coral = world.materials.find("Lighting - Coral").unwrap();
        let marker = world.materials.find("Marker").unwrap();
        let at = Transform::from_position(Vec3::Y);

        let light = world
            .spawn(EntityType::LightSource, at, Some(sphere), Some(coral))
            .unwrap();

        let entity = world.store.get_entity::<LightSourceEntity>(light).unwrap();
        assert_eq!(entity.core.material, Some(marker));
        let model = world.meshes.get(sphere).unwrap().instances.instance(0).unwrap().matrix();
        let (scale, _, translation) = model.to_scale_rotation_translation();
        assert!(scale.abs_diff_eq(Vec3::splat(LIGHT_MARKER_SCALE), 1e-6));
        assert_eq!(translation, Vec3::Y);
        assert_eq!(world.light_sources().len(), 1);
    }

    #[test]
    fn test_light_source_without_mesh_has_no_instance() {
        let mut world = world();
        world
            .spawn(EntityType::LightSource, Transform::IDENTITY, None, None)
            .unwrap();
        assert_eq!(world.meshes.instance_count(), 0);
    }

    #[test]
    fn test_despawn_removes_everything() {
        let mut world = world();
        let cube = world.meshes.find("Cube").unwrap();
        let a = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let b = world
            .spawn(EntityType::Wall, Transform::from_position(Vec3::X), None, None)
            .unwrap();

        assert!(world.despawn(a));
        assert!(!world.store.contains(a));
        assert_eq!(world.walls().len(), 1);
        assert_eq!(world.walls()[0], b);
        let instances = &world.meshes.get(cube).unwrap().instances;
        assert_eq!(instances.len(), 1);
        assert_eq!(instances.entity(0), Some(b));

        assert!(!world.despawn(a));
    }

    #[test]
    fn test_set_transform_updates_instance() {
        let mut world = world();
        let cube = world.meshes.find("Cube").unwrap();
        let wall = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        let moved = Transform::from_position(Vec3::new(0.0, 0.0, 4.0));

        assert!(world.set_transform(wall, moved));
        assert_eq!(world.transform(wall), Some(moved));
        let instances = &world.meshes.get(cube).unwrap().instances;
        assert!(instances.requires_gpu_update());
        assert_eq!(instances.instance(0).unwrap().matrix(), moved.matrix());
    }

    #[test]
    fn test_clear() {
        let mut world = world();
        let wall = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        world
            .spawn(EntityType::Prop, Transform::IDENTITY, None, None)
            .unwrap();

        world.clear();
        assert!(world.store.is_empty());
        assert_eq!(world.meshes.instance_count(), 0);
        assert!(world.walls().is_empty());
        assert!(!world.store.contains(wall));
    }

    #[test]
    fn test_spawn_without_meshes() {
        let mut world = GameWorld::new(
            EntityStore::new(8),
            MeshLibrary::new(10, 1),
            MaterialLibrary::new(),
        );
        let wall = world.spawn(EntityType::Wall, Transform::IDENTITY, None, None).unwrap();
        assert!(world.store.contains(wall));
        assert_eq!(world.meshes.instance_count(), 0);
    }
}
