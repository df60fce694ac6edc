//! Rendering module
//!
//! Meshes and materials live in libraries addressed by id. Each mesh carries
//! its instance table; the frame driver turns those tables into one instanced
//! draw per (mesh, material) pair.

mod camera;
mod context;
mod frame;
mod instances;
mod lights;
mod material;
mod mesh;
mod texture;

pub use camera::{Camera, CameraUniform, FlyCamera};
pub use context::Renderer;
pub use frame::{
    AcquireStatus, DEFAULT_FRAMES_IN_FLIGHT, FrameBackend, FrameDriver, FrameError, FrameGlobals,
    FrameReport, FrameState, PresentStatus,
};
pub use instances::{DEFAULT_MAX_INSTANCES, DrawBatch, InstanceError, InstanceTable, InstancedData};
pub use lights::{
    DynamicLight, GpuLight, LightStorage, LightType, LightingSystem, MAX_DYNAMIC_LIGHTS,
    SceneLighting,
};
pub use material::{
    BASIC_LIGHTING_PALETTE, Material, MaterialId, MaterialLibrary, MaterialType, MaterialUniform,
};
pub use mesh::{Mesh, MeshData, MeshId, MeshLibrary, MeshLoadError, Vertex, load_gltf};
pub use texture::{Texture, TextureError, TextureImage};
