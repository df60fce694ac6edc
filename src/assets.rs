//! Asset files registered at startup
//!
//! An [`AssetManifest`] lists glTF mesh files and textured materials. The
//! runtime registers it after the game's built-in assets and before the
//! startup level, so level files can name anything it provides. Relative
//! paths are taken from the working directory.

use std::path::{Path, PathBuf};

use glam::Vec3;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::renderer::{Material, TextureImage};
use crate::world::GameWorld;

/// A material that samples an image file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexturedMaterialEntry {
    /// Name level files use for the material
    pub name: String,
    pub texture: PathBuf,
    #[serde(default = "white")]
    pub tint: [f32; 3],
}

fn white() -> [f32; 3] {
    [1.0; 3]
}

/// Asset files to register before any level is loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    /// glTF files; every mesh inside is registered under its glTF name
    pub meshes: Vec<PathBuf>,
    pub textured_materials: Vec<TexturedMaterialEntry>,
}

/// Counts from one [`AssetManifest::register`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub meshes: usize,
    pub materials: usize,
    /// Files that could not be read or decoded
    pub failed: usize,
}

impl AssetManifest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.textured_materials.is_empty()
    }

    pub fn with_mesh_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.meshes.push(path.into());
        self
    }

    pub fn with_textured_material(
        mut self,
        name: impl Into<String>,
        texture: impl Into<PathBuf>,
    ) -> Self {
        self.textured_materials.push(TexturedMaterialEntry {
            name: name.into(),
            texture: texture.into(),
            tint: white(),
        });
        self
    }

    /// Load every listed file into the world's libraries.
    ///
    /// A file that fails is logged and skipped; the rest still load. A mesh
    /// file listed twice is loaded once.
    pub fn register(&self, world: &mut GameWorld) -> AssetReport {
        let mut report = AssetReport::default();

        let mut seen: FxHashSet<&Path> = FxHashSet::default();
        for path in &self.meshes {
            if !seen.insert(path.as_path()) {
                log::debug!("mesh file {} listed twice", path.display());
                continue;
            }
            match world.meshes.load_gltf(path) {
                Ok(ids) => report.meshes += ids.len(),
                Err(err) => {
                    log::warn!("mesh file {} not loaded: {err}", path.display());
                    report.failed += 1;
                }
            }
        }

        for entry in &self.textured_materials {
            match TextureImage::load(&entry.texture) {
                Ok(image) => {
                    let material = Material::textured(&entry.name, image, Vec3::from(entry.tint));
                    world.materials.add(material);
                    report.materials += 1;
                }
                Err(err) => {
                    log::warn!("material '{}' not registered: {err}", entry.name);
                    report.failed += 1;
                }
            }
        }

        if !self.is_empty() {
            log::info!(
                "registered {} meshes and {} textured materials, {} files failed",
                report.meshes,
                report.materials,
                report.failed
            );
        }
        report
    }
}
