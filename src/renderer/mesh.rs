//! Mesh and vertex definitions, and the mesh library

use std::fmt;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::instances::{InstanceError, InstanceTable};
use super::material::MaterialId;
use crate::entity::EntityHandle;
use crate::memory::ChunkedArray;

/// Vertex with position, normal, and UV coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Get the vertex buffer layout for wgpu
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
            0 => Float32x3, // position
            1 => Float32x3, // normal
            2 => Float32x2, // uv
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// CPU geometry: vertices and triangle indices
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create geometry from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Unit cube centered at origin
    pub fn cube() -> Self {
        // (normal, tangent u, tangent v) per face
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in FACES {
            let (normal, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            let base = vertices.len() as u32;
            for (a, b) in CORNERS {
                let position = normal * 0.5 + u * a + v * b;
                vertices.push(Vertex::new(position.into(), normal.into(), [a + 0.5, b + 0.5]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    /// Plane on the XZ axis
    pub fn plane(size: f32) -> Self {
        let half = size / 2.0;
        let vertices = vec![
            Vertex::new([-half, 0.0, half], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex::new([half, 0.0, half], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new([half, 0.0, -half], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new([-half, 0.0, -half], [0.0, 1.0, 0.0], [0.0, 1.0]),
        ];

        Self::new(vertices, vec![0, 1, 2, 2, 3, 0])
    }

    /// UV sphere
    pub fn sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = radius * phi.cos();
            let ring_radius = radius * phi.sin();

            for segment in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * segment as f32 / segments as f32;
                let position = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());

                vertices.push(Vertex::new(
                    position.into(),
                    position.normalize_or(Vec3::Y).into(),
                    [segment as f32 / segments as f32, ring as f32 / rings as f32],
                ));
            }
        }

        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;
                indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        Self::new(vertices, indices)
    }

    /// Append another primitive, offsetting its indices
    pub fn append(&mut self, other: MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    /// Whether there is anything to draw
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }
}

/// Errors from loading mesh files
#[derive(Debug, Error)]
pub enum MeshLoadError {
    #[error("failed to import glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("glTF primitive without positions in mesh '{0}'")]
    MissingPositions(String),
}

/// Load every mesh of a glTF file as named geometry.
///
/// Primitives of one glTF mesh are merged. Missing normals default to +Y and
/// missing UVs to zero.
pub fn load_gltf(path: impl AsRef<Path>) -> Result<Vec<(String, MeshData)>, MeshLoadError> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("mesh"));

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let name = mesh
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{stem}_{}", mesh.index()));
        let mut data = MeshData::default();

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| MeshLoadError::MissingPositions(name.clone()))?
                .collect();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(Iterator::collect)
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|coords| coords.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|indices| indices.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, &position)| {
                    Vertex::new(
                        position,
                        normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                        uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                    )
                })
                .collect();
            data.append(MeshData::new(vertices, indices));
        }

        log::info!(
            "loaded mesh '{}' from {} ({} vertices)",
            name,
            path.display(),
            data.vertices.len()
        );
        meshes.push((name, data));
    }

    Ok(meshes)
}

/// Index of a mesh in the [`MeshLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u32);

impl MeshId {
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// GPU buffers owned by a mesh.
#[derive(Debug)]
pub struct MeshBuffers {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    /// One instance buffer per frame in flight, sized for `max_instances`
    pub(crate) instance_buffers: Vec<wgpu::Buffer>,
}

/// A named mesh: geometry, GPU buffers and its instance table
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub data: MeshData,
    pub instances: InstanceTable,
    pub(crate) gpu: Option<MeshBuffers>,
}

impl Mesh {
    /// Get the number of indices
    pub fn index_count(&self) -> u32 {
        self.data.indices.len() as u32
    }

    /// Check if the mesh has been uploaded to GPU
    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }
}

/// Owner of every mesh, addressed by [`MeshId`] or name.
///
/// Meshes live in a chunked array, so a `&Mesh` obtained earlier is never
/// moved by later registrations.
#[derive(Debug)]
pub struct MeshLibrary {
    meshes: ChunkedArray<Mesh>,
    by_name: FxHashMap<String, MeshId>,
    max_instances: usize,
    frames_in_flight: usize,
}

impl MeshLibrary {
    #[must_use]
    pub fn new(max_instances: usize, frames_in_flight: usize) -> Self {
        Self {
            meshes: ChunkedArray::new(16),
            by_name: FxHashMap::default(),
            max_instances,
            frames_in_flight,
        }
    }

    /// Register geometry under a name. A taken name returns the existing id.
    pub fn add(&mut self, name: impl Into<String>, data: MeshData) -> MeshId {
        let name = name.into();
        if let Some(&existing) = self.by_name.get(&name) {
            log::warn!("mesh '{name}' already registered");
            return existing;
        }

        let id = MeshId::from_index(self.meshes.len());
        log::debug!("registered mesh '{}' as {}", name, id);
        self.by_name.insert(name.clone(), id);
        self.meshes.push_back(Mesh {
            name,
            data,
            instances: InstanceTable::new(self.max_instances, self.frames_in_flight),
            gpu: None,
        });
        id
    }

    /// Register the built-in cube, plane and sphere
    pub fn add_primitives(&mut self) -> [MeshId; 3] {
        [
            self.add("Cube", MeshData::cube()),
            self.add("Plane", MeshData::plane(1.0)),
            self.add("Sphere", MeshData::sphere(0.5, 24, 16)),
        ]
    }

    /// Load a glTF file and register each of its meshes
    pub fn load_gltf(&mut self, path: impl AsRef<Path>) -> Result<Vec<MeshId>, MeshLoadError> {
        Ok(load_gltf(path)?
            .into_iter()
            .map(|(name, data)| self.add(name, data))
            .collect())
    }

    /// Register an instance of `mesh` for `entity`.
    pub fn add_mesh_instance(
        &mut self,
        mesh: MeshId,
        entity: EntityHandle,
        model: Mat4,
        material: MaterialId,
    ) -> Result<usize, InstanceError> {
        let Some(target) = self.meshes.get_mut(mesh.index()) else {
            log::error!("cannot add instance for {entity}: unknown {mesh}");
            return Err(InstanceError::UnknownMesh(mesh.0));
        };
        target.instances.add(entity, model, material)
    }

    /// Drop every instance of `mesh`, keeping storage.
    pub fn clear_mesh_instances(&mut self, mesh: MeshId) {
        if let Some(target) = self.meshes.get_mut(mesh.index()) {
            target.instances.clear();
        }
    }

    /// Drop the instances of every mesh
    pub fn clear_all_instances(&mut self) {
        for mesh in self.meshes.iter_mut() {
            mesh.instances.clear();
        }
    }

    #[must_use]
    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.index())
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.index())
    }

    /// Look a mesh up by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<MeshId> {
        self.by_name.get(name).copied()
    }

    /// Mesh at a UI list position
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<MeshId> {
        (index < self.meshes.len()).then(|| MeshId::from_index(index))
    }

    #[must_use]
    pub fn name_of(&self, id: MeshId) -> Option<&str> {
        self.get(id).map(|mesh| mesh.name.as_str())
    }

    /// First registered mesh
    #[must_use]
    pub fn first(&self) -> Option<MeshId> {
        self.id_at(0)
    }

    /// All meshes with their ids
    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(index, mesh)| (MeshId::from_index(index), mesh))
    }

    /// All meshes mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MeshId, &mut Mesh)> {
        self.meshes
            .iter_mut()
            .enumerate()
            .map(|(index, mesh)| (MeshId::from_index(index), mesh))
    }

    /// Total registered instances across meshes
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.instances.len()).sum()
    }

    #[must_use]
    pub const fn max_instances(&self) -> usize {
        self.max_instances
    }

    #[must_use]
    pub const fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityStore, EntityType};

    #[test]
    fn test_cube_geometry() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for vertex in &cube.vertices {
            let position = Vec3::from(vertex.position);
            let normal = Vec3::from(vertex.normal);
            // Every corner lies on its face plane
            assert!((position.dot(normal) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cube_faces_wind_counter_clockwise() {
        let cube = MeshData::cube();
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(cube.vertices[i as usize].position));
            let normal = Vec3::from(cube.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut data = MeshData::plane(1.0);
        data.append(MeshData::plane(2.0));
        assert_eq!(data.vertices.len(), 8);
        assert_eq!(&data.indices[6..], &[4, 5, 6, 6, 7, 4]);
    }

    #[test]
    fn test_library_lookup() {
        let mut library = MeshLibrary::new(10, 2);
        let [cube, plane, sphere] = library.add_primitives();

        assert_eq!(library.len(), 3);
        assert_eq!(library.find("Cube"), Some(cube));
        assert_eq!(library.find("Plane"), Some(plane));
        assert_eq!(library.name_of(sphere), Some("Sphere"));
        assert_eq!(library.first(), Some(cube));
        assert_eq!(library.id_at(3), None);
        assert_eq!(library.add("Cube", MeshData::cube()), cube);
    }

    #[test]
    fn test_load_gltf_fills_missing_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(dir.path().join("shard.bin"), bytes).unwrap();
        std::fs::write(
            dir.path().join("shard.gltf"),
            r#"{
                "asset": {"version": "2.0"},
                "buffers": [{"uri": "shard.bin", "byteLength": 36}],
                "bufferViews": [{"buffer": 0, "byteLength": 36}],
                "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3,
                    "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}]
            }"#,
        )
        .unwrap();

        let mut library = MeshLibrary::new(4, 2);
        let ids = library.load_gltf(dir.path().join("shard.gltf")).unwrap();
        assert_eq!(ids.len(), 1);

        // Unnamed meshes are named after the file
        let mesh = library.get(ids[0]).unwrap();
        assert_eq!(mesh.name, "shard_0");
        assert_eq!(mesh.data.indices, vec![0, 1, 2]);
        assert!(mesh.data.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_load_gltf_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = MeshLibrary::new(4, 2);
        let err = library.load_gltf(dir.path().join("absent.gltf")).unwrap_err();
        assert!(matches!(err, MeshLoadError::Gltf(_)));
        assert!(library.is_empty());
    }

    #[test]
    fn test_mesh_instances_through_library() {
        let mut store = EntityStore::new(16);
        let mut library = MeshLibrary::new(1, 2);
        let cube = library.add("Cube", MeshData::cube());
        let material = MaterialId::from_index(0);

        let a = store.add_entity(EntityType::Wall).unwrap();
        let b = store.add_entity(EntityType::Wall).unwrap();
        assert_eq!(library.add_mesh_instance(cube, a, Mat4::IDENTITY, material), Ok(0));
        assert_eq!(
            library.add_mesh_instance(cube, b, Mat4::IDENTITY, material),
            Err(InstanceError::Full { max_instances: 1 })
        );
        assert_eq!(
            library.add_mesh_instance(MeshId(9), b, Mat4::IDENTITY, material),
            Err(InstanceError::UnknownMesh(9))
        );

        library.clear_mesh_instances(cube);
        assert_eq!(library.instance_count(), 0);
        assert!(library.get(cube).unwrap().instances.requires_gpu_update());
    }

    #[test]
    fn test_mesh_reference_survives_library_growth() {
        let mut library = MeshLibrary::new(10, 2);
        let cube = library.add("Cube", MeshData::cube());
        let before: *const Mesh = library.get(cube).unwrap();

        for i in 0..64 {
            library.add(format!("Extra {i}"), MeshData::plane(1.0));
        }

        assert!(std::ptr::eq(before, library.get(cube).unwrap()));
    }
}
