//! Level file layout
//!
//! ```json
//! {
//!   "levelName": "Courtyard",
//!   "version": "1.0",
//!   "entities": [
//!     { "type": "Wall", "position": [0, 0, 0], "rotation": [0, 90, 0],
//!       "scale": [1, 1, 1], "materialName": "Stone", "meshName": "Cube" }
//!   ]
//! }
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityType, Transform};

/// Name given to levels that never had one
pub const DEFAULT_LEVEL_NAME: &str = "Untitled";
/// Version written into new level files
pub const DEFAULT_LEVEL_VERSION: &str = "1.0";

/// A whole level file. Loading parses entities as raw JSON first so one
/// bad record does not reject the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDocument<E = EntityRecord> {
    #[serde(default = "default_name")]
    pub level_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Vec::new")]
    pub entities: Vec<E>,
}

/// One entity in a level file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Entity type name; absent means wall
    #[serde(rename = "type", default = "default_type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_name: Option<String>,
}

impl EntityRecord {
    pub fn new(kind: EntityType, transform: &Transform) -> Self {
        Self {
            type_name: kind.display_name().to_owned(),
            id: None,
            position: transform.position.into(),
            rotation: transform.rotation.into(),
            scale: transform.scale.into(),
            material_name: None,
            mesh_name: None,
        }
    }

    /// Entity type, with unknown names mapped to the player type
    pub fn kind(&self) -> EntityType {
        EntityType::from_name(&self.type_name).unwrap_or_else(|| {
            log::warn!(
                "unknown entity type '{}', using {}",
                self.type_name,
                EntityType::default()
            );
            EntityType::default()
        })
    }

    pub fn transform(&self) -> Transform {
        Transform::new(
            Vec3::from(self.position),
            Vec3::from(self.rotation),
            Vec3::from(self.scale),
        )
    }
}

fn default_name() -> String {
    DEFAULT_LEVEL_NAME.to_owned()
}

fn default_version() -> String {
    DEFAULT_LEVEL_VERSION.to_owned()
}

fn default_type() -> String {
    EntityType::Wall.display_name().to_owned()
}

fn unit_scale() -> [f32; 3] {
    [1.0; 3]
}
