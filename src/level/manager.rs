//! Level loading and saving

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::format::{DEFAULT_LEVEL_NAME, DEFAULT_LEVEL_VERSION, EntityRecord, LevelDocument};
use crate::world::GameWorld;

/// Records past this count are ignored on load
pub const MAX_LEVEL_ENTITIES: usize = 1_000;

/// Errors that can occur loading or saving a level
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed level file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize level: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Metadata of the level currently in the world
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    pub name: String,
    pub version: String,
    pub entity_count: usize,
}

impl Default for LevelInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_LEVEL_NAME.to_owned(),
            version: DEFAULT_LEVEL_VERSION.to_owned(),
            entity_count: 0,
        }
    }
}

/// Outcome of applying a level to the world
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub spawned: usize,
    pub skipped: usize,
}

/// Moves levels between disk and the [`GameWorld`]
#[derive(Debug)]
pub struct LevelManager {
    level_dir: PathBuf,
    current: LevelInfo,
    loaded: bool,
}

impl LevelManager {
    pub fn new(level_dir: impl Into<PathBuf>) -> Self {
        Self {
            level_dir: level_dir.into(),
            current: LevelInfo::default(),
            loaded: false,
        }
    }

    #[must_use]
    pub fn level_dir(&self) -> &Path {
        &self.level_dir
    }

    #[must_use]
    pub fn current(&self) -> &LevelInfo {
        &self.current
    }

    /// Whether the world holds a level that came from disk
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Relative paths are taken from the level directory
    #[must_use]
    pub fn resolve(&self, file: impl AsRef<Path>) -> PathBuf {
        let file = file.as_ref();
        if file.is_absolute() || file.starts_with(&self.level_dir) {
            file.to_path_buf()
        } else {
            self.level_dir.join(file)
        }
    }

    /// File names of the `.json` levels in the level directory, sorted
    pub fn available_levels(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.level_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_name()?.to_str().map(str::to_owned))
            .collect();
        names.sort();
        names
    }

    /// Drop every entity and reset the metadata
    pub fn clear(&mut self, world: &mut GameWorld) {
        world.clear();
        self.current = LevelInfo::default();
        self.loaded = false;
    }

    /// Replace the world's contents with a level file.
    ///
    /// # Errors
    ///
    /// Fails without touching the world if the file cannot be read or is not
    /// a level document. Individual bad records are skipped.
    pub fn load(
        &mut self,
        world: &mut GameWorld,
        file: impl AsRef<Path>,
    ) -> Result<LoadReport, LevelError> {
        let path = self.resolve(file);
        let text = fs::read_to_string(&path).map_err(|source| LevelError::Io {
            path: path.clone(),
            source,
        })?;
        let document: LevelDocument<serde_json::Value> =
            serde_json::from_str(&text).map_err(|source| LevelError::Parse {
                path: path.clone(),
                source,
            })?;

        let report = self.apply_document(world, document);
        log::info!(
            "loaded level '{}' from {}: {} entities, {} skipped",
            self.current.name,
            path.display(),
            report.spawned,
            report.skipped
        );
        Ok(report)
    }

    /// Clear the world and spawn every record of `document`
    pub fn apply_document(
        &mut self,
        world: &mut GameWorld,
        document: LevelDocument<serde_json::Value>,
    ) -> LoadReport {
        self.clear(world);

        let mut report = LoadReport::default();
        if document.entities.len() > MAX_LEVEL_ENTITIES {
            log::warn!(
                "level has {} entities, only the first {MAX_LEVEL_ENTITIES} are loaded",
                document.entities.len()
            );
            report.skipped += document.entities.len() - MAX_LEVEL_ENTITIES;
        }

        for (index, value) in document
            .entities
            .into_iter()
            .take(MAX_LEVEL_ENTITIES)
            .enumerate()
        {
            let record: EntityRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("skipping entity {index}: {err}");
                    report.skipped += 1;
                    continue;
                }
            };

            let mesh = record
                .mesh_name
                .as_deref()
                .and_then(|name| world.meshes.find(name));
            let material = record
                .material_name
                .as_deref()
                .and_then(|name| world.materials.find(name));

            match world.spawn(record.kind(), record.transform(), mesh, material) {
                Ok(_) => report.spawned += 1,
                Err(err) => {
                    log::warn!("skipping entity {index}: {err}");
                    report.skipped += 1;
                }
            }
        }

        self.current = LevelInfo {
            name: document.level_name,
            version: document.version,
            entity_count: report.spawned,
        };
        self.loaded = true;
        report
    }

    /// Snapshot of every live, active entity
    #[must_use]
    pub fn to_document(&self, world: &GameWorld) -> LevelDocument {
        let entities = world
            .store
            .iter_live()
            .filter_map(|handle| {
                let entity = world.store.get_dyn(handle)?;
                if !entity.is_active() {
                    return None;
                }
                let mut record = EntityRecord::new(handle.kind(), entity.transform());
                record.id = Some(handle.slot_index());
                record.mesh_name = entity
                    .mesh()
                    .and_then(|id| world.meshes.name_of(id))
                    .map(str::to_owned);
                record.material_name = entity
                    .material()
                    .and_then(|id| world.materials.name_of(id))
                    .map(str::to_owned);
                Some(record)
            })
            .collect();

        LevelDocument {
            level_name: self.current.name.clone(),
            version: self.current.version.clone(),
            entities,
        }
    }

    /// Write the world to a level file, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save(&mut self, world: &GameWorld, file: impl AsRef<Path>) -> Result<(), LevelError> {
        let path = self.resolve(file);
        let document = self.to_document(world);
        let json = serde_json::to_string_pretty(&document).map_err(LevelError::Serialize)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LevelError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, json).map_err(|source| LevelError::Io {
            path: path.clone(),
            source,
        })?;

        self.current.entity_count = document.entities.len();
        log::info!(
            "saved level '{}' to {}: {} entities",
            self.current.name,
            path.display(),
            document.entities.len()
        );
        Ok(())
    }

    /// Start an empty level and write it as `<name>.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the empty level cannot be saved
    pub fn new_level(&mut self, world: &mut GameWorld, name: &str) -> Result<PathBuf, LevelError> {
        self.clear(world);
        self.current.name = name.to_owned();
        let file = PathBuf::from(format!("{name}.json"));
        self.save(world, &file)?;
        self.loaded = true;
        Ok(self.resolve(file))
    }
}
