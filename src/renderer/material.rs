//! Materials and the material library

use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rustc_hash::FxHashMap;

use super::texture::TextureImage;
use crate::memory::ChunkedArray;

/// Material properties for rendering
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    /// Base color (RGB)
    pub color: [f32; 3],
    /// Specular strength
    pub specular: f32,
    /// Shininess factor
    pub shininess: f32,
    /// Whether to use texture (1.0) or solid color (0.0)
    pub use_texture: f32,
    /// Whether lighting is applied (0.0 for unlit)
    pub lit: f32,
    /// Padding for alignment
    _padding: f32,
}

/// How a material is shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialType {
    /// Textured, lit surface
    Pbr,
    /// Flat color, ignores lights
    Unlit,
    /// Solid color lit by scene lights
    Lighting,
}

/// Index of a material in the [`MaterialLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

impl MaterialId {
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

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

/// GPU side of a material: one bind group per frame in flight.
#[derive(Debug)]
pub struct MaterialGpu {
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bind_groups: Vec<wgpu::BindGroup>,
}

/// Material definition
#[derive(Debug)]
pub struct Material {
    /// Unique name used by level files
    pub name: String,
    pub kind: MaterialType,
    /// Base color
    pub color: Vec3,
    /// Specular reflectivity (0.0 - 1.0)
    pub specular: f32,
    /// Shininess exponent
    pub shininess: f32,
    /// Decoded image sampled by the material, if any
    pub texture: Option<TextureImage>,
    pub(crate) gpu: Option<MaterialGpu>,
}

impl Material {
    /// Create a lit solid-color material
    pub fn new(name: impl Into<String>, kind: MaterialType, color: Vec3) -> Self {
        Self {
            name: name.into(),
            kind,
            color,
            specular: 0.5,
            shininess: 32.0,
            texture: None,
            gpu: None,
        }
    }

    /// Solid color lit by the scene
    pub fn lighting(name: impl Into<String>, color: Vec3) -> Self {
        Self::new(name, MaterialType::Lighting, color)
    }

    /// Flat color, no lighting
    pub fn unlit(name: impl Into<String>, color: Vec3) -> Self {
        Self {
            specular: 0.0,
            shininess: 1.0,
            ..Self::new(name, MaterialType::Unlit, color)
        }
    }

    /// Textured material with a tint color
    pub fn textured(name: impl Into<String>, texture: TextureImage, tint: Vec3) -> Self {
        Self {
            texture: Some(texture),
            ..Self::new(name, MaterialType::Pbr, tint)
        }
    }

    /// Whether GPU resources have been created
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// Bind group for a frame slot, once uploaded
    #[must_use]
    pub fn bind_group(&self, slot: usize) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref()?.bind_groups.get(slot)
    }

    /// Convert to uniform data
    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            color: self.color.into(),
            specular: self.specular,
            shininess: self.shininess,
            use_texture: if self.texture.is_some() { 1.0 } else { 0.0 },
            lit: if self.kind == MaterialType::Unlit {
                0.0
            } else {
                1.0
            },
            _padding: 0.0,
        }
    }
}

/// Colors of the built-in lighting materials
pub const BASIC_LIGHTING_PALETTE: [(&str, Vec3); 7] = [
    ("Lighting - Coral", Vec3::new(1.0, 0.5, 0.31)),
    ("Lighting - Red", Vec3::new(1.0, 0.0, 0.0)),
    ("Lighting - Green", Vec3::new(0.0, 1.0, 0.0)),
    ("Lighting - Blue", Vec3::new(0.0, 0.0, 1.0)),
    ("Lighting - Yellow", Vec3::new(1.0, 1.0, 0.0)),
    ("Lighting - Purple", Vec3::new(1.0, 0.0, 1.0)),
    ("Lighting - White", Vec3::new(1.0, 1.0, 1.0)),
];

/// Name-keyed owner of every material.
#[derive(Debug)]
pub struct MaterialLibrary {
    materials: ChunkedArray<Material>,
    by_name: FxHashMap<String, MaterialId>,
}

impl MaterialLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self {
            materials: ChunkedArray::new(16),
            by_name: FxHashMap::default(),
        }
    }

    /// Register a material. A name that is already taken returns the existing id.
    pub fn add(&mut self, material: Material) -> MaterialId {
        if let Some(&existing) = self.by_name.get(&material.name) {
            log::warn!("material '{}' already registered", material.name);
            return existing;
        }

        let id = MaterialId::from_index(self.materials.len());
        log::debug!("registered material '{}' as {}", material.name, id);
        self.by_name.insert(material.name.clone(), id);
        self.materials.push_back(material);
        id
    }

    /// Register the built-in lighting palette, returning the ids in palette order.
    pub fn add_basic_lighting_materials(&mut self) -> Vec<MaterialId> {
        BASIC_LIGHTING_PALETTE
            .iter()
            .map(|&(name, color)| self.add(Material::lighting(name, color)))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.index())
    }

    /// Look a material up by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    /// Material at a UI list position
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<MaterialId> {
        (index < self.materials.len()).then(|| MaterialId::from_index(index))
    }

    /// Name of a material
    #[must_use]
    pub fn name_of(&self, id: MaterialId) -> Option<&str> {
        self.get(id).map(|material| material.name.as_str())
    }

    /// First registered material
    #[must_use]
    pub fn first(&self) -> Option<MaterialId> {
        self.id_at(0)
    }

    /// First material that is not a lighting material
    #[must_use]
    pub fn first_non_lighting(&self) -> Option<MaterialId> {
        self.materials
            .position(|material| material.kind != MaterialType::Lighting)
            .map(MaterialId::from_index)
    }

    /// All materials with their ids, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(index, material)| (MaterialId::from_index(index), material))
    }

    /// All materials mutably, in registration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MaterialId, &mut Material)> {
        self.materials
            .iter_mut()
            .enumerate()
            .map(|(index, material)| (MaterialId::from_index(index), material))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_find() {
        let mut library = MaterialLibrary::new();
        let stone = library.add(Material::unlit("Stone", Vec3::splat(0.5)));

        assert_eq!(library.find("Stone"), Some(stone));
        assert_eq!(library.name_of(stone), Some("Stone"));
        assert_eq!(library.find("Marble"), None);
    }

    #[test]
    fn test_duplicate_name_returns_existing() {
        let mut library = MaterialLibrary::new();
        let first = library.add(Material::unlit("Stone", Vec3::ONE));
        let second = library.add(Material::lighting("Stone", Vec3::ZERO));

        assert_eq!(first, second);
        assert_eq!(library.len(), 1);
        assert_eq!(library.get(first).unwrap().kind, MaterialType::Unlit);
    }

    #[test]
    fn test_basic_palette() {
        let mut library = MaterialLibrary::new();
        let ids = library.add_basic_lighting_materials();

        assert_eq!(ids.len(), BASIC_LIGHTING_PALETTE.len());
        let coral = library.get(library.find("Lighting - Coral").unwrap()).unwrap();
        assert_eq!(coral.color, Vec3::new(1.0, 0.5, 0.31));
        assert_eq!(coral.kind, MaterialType::Lighting);
    }

    #[test]
    fn test_first_non_lighting() {
        let mut library = MaterialLibrary::new();
        library.add_basic_lighting_materials();
        assert_eq!(library.first_non_lighting(), None);

        let marker = library.add(Material::unlit("Marker", Vec3::ONE));
        assert_eq!(library.first_non_lighting(), Some(marker));
    }

    #[test]
    fn test_uniform_flags() {
        let unlit = Material::unlit("Flat", Vec3::ONE).to_uniform();
        assert_eq!(unlit.lit, 0.0);
        assert_eq!(unlit.use_texture, 0.0);

        let textured = Material::textured("Brick", TextureImage::solid([180, 70, 50, 255]), Vec3::ONE).to_uniform();
        assert_eq!(textured.lit, 1.0);
        assert_eq!(textured.use_texture, 1.0);
    }
}
