//! Scene lighting
//!
//! A sun, an ambient term and up to [`MAX_DYNAMIC_LIGHTS`] dynamic lights.
//! Dynamic lights are kept densely packed: removal moves the last light into
//! the freed index.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::entity::{EntityHandle, EntityStore, LightSourceEntity};

/// Maximum number of dynamic lights
pub const MAX_DYNAMIC_LIGHTS: usize = 32;

/// Type of light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum LightType {
    /// Parallel rays
    Directional = 0,
    /// Emits in all directions from a point
    #[default]
    Point = 1,
    /// Cone of light from a point
    Spot = 2,
}

/// GPU-compatible light data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    pub light_type: u32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub direction: [f32; 3],
    /// Cosine of the inner cone angle
    pub inner_cone_cos: f32,
    /// Cosine of the outer cone angle
    pub outer_cone_cos: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

/// Lighting uniform uploaded each frame
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightStorage {
    /// Ambient color premultiplied by intensity
    pub ambient: [f32; 3],
    pub num_lights: u32,
    pub sun_direction: [f32; 3],
    pub sun_intensity: f32,
    pub sun_color: [f32; 3],
    _padding: f32,
    pub lights: [GpuLight; MAX_DYNAMIC_LIGHTS],
}

/// Sun and ambient settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLighting {
    /// Normalized direction the sunlight travels
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
    pub sun_intensity: f32,
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            sun_direction: Vec3::new(0.3, -0.8, -0.5).normalize(),
            sun_color: Vec3::new(1.0, 1.0, 0.9),
            sun_intensity: 0.4,
            ambient_color: Vec3::new(0.1, 0.1, 0.15),
            ambient_intensity: 0.2,
        }
    }
}

/// A light in the dynamic set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicLight {
    /// Entity the light was gathered from, or invalid for free-standing lights
    pub owner: EntityHandle,
    pub kind: LightType,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub direction: Vec3,
    /// Inner cone angle in degrees
    pub inner_cone: f32,
    /// Outer cone angle in degrees
    pub outer_cone: f32,
}

impl DynamicLight {
    /// Light with default attenuation and cone
    #[must_use]
    pub fn new(kind: LightType, position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            owner: EntityHandle::INVALID,
            kind,
            position,
            color,
            intensity,
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            direction: Vec3::NEG_Y,
            inner_cone: 12.5,
            outer_cone: 15.0,
        }
    }

    /// Convert to GPU light
    #[must_use]
    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            position: self.position.into(),
            light_type: self.kind as u32,
            color: self.color.into(),
            intensity: self.intensity,
            direction: self.direction.into(),
            inner_cone_cos: self.inner_cone.to_radians().cos(),
            outer_cone_cos: self.outer_cone.to_radians().cos(),
            constant: self.constant,
            linear: self.linear,
            quadratic: self.quadratic,
        }
    }
}

/// Sun, ambient and the packed dynamic light set
#[derive(Debug, Default)]
pub struct LightingSystem {
    pub scene: SceneLighting,
    lights: Vec<DynamicLight>,
    /// Light sources left out by the last gather
    dropped_sources: usize,
}

impl LightingSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scene: SceneLighting::default(),
            lights: Vec::with_capacity(MAX_DYNAMIC_LIGHTS),
            dropped_sources: 0,
        }
    }

    /// Replace the sun and ambient settings
    pub fn set_scene_lighting(&mut self, mut scene: SceneLighting) {
        scene.sun_direction = scene.sun_direction.normalize_or(Vec3::NEG_Y);
        self.scene = scene;
    }

    /// Add a light. Returns its index, or `None` when the set is full.
    pub fn add(&mut self, light: DynamicLight) -> Option<usize> {
        if self.lights.len() >= MAX_DYNAMIC_LIGHTS {
            log::error!("cannot add light: all {MAX_DYNAMIC_LIGHTS} dynamic lights in use");
            return None;
        }
        self.lights.push(light);
        Some(self.lights.len() - 1)
    }

    /// Add a point light with explicit attenuation
    pub fn add_point_light(
        &mut self,
        position: Vec3,
        color: Vec3,
        intensity: f32,
        (constant, linear, quadratic): (f32, f32, f32),
    ) -> Option<usize> {
        self.add(DynamicLight {
            constant,
            linear,
            quadratic,
            ..DynamicLight::new(LightType::Point, position, color, intensity)
        })
    }

    /// Add a spot light with cone angles in degrees
    pub fn add_spot_light(
        &mut self,
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        (inner_cone, outer_cone): (f32, f32),
    ) -> Option<usize> {
        self.add(DynamicLight {
            direction: direction.normalize_or(Vec3::NEG_Y),
            inner_cone,
            outer_cone,
            ..DynamicLight::new(LightType::Spot, position, color, intensity)
        })
    }

    /// Remove light `index`; the last light takes its place.
    pub fn remove(&mut self, index: usize) -> Option<DynamicLight> {
        (index < self.lights.len()).then(|| self.lights.swap_remove(index))
    }

    /// Move light `index`
    pub fn set_position(&mut self, index: usize, position: Vec3) -> bool {
        match self.lights.get_mut(index) {
            Some(light) => {
                light.position = position;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DynamicLight> {
        self.lights.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Replace the entity-owned lights with the given light source entities.
    ///
    /// Lights added directly are kept. Stale and inactive handles are
    /// skipped, and sources beyond the limit are dropped.
    pub fn gather_light_sources<'a>(
        &mut self,
        store: &EntityStore,
        sources: impl IntoIterator<Item = &'a EntityHandle>,
    ) {
        self.lights.retain(|light| !light.owner.is_valid());
        let mut dropped = 0;
        for &handle in sources {
            let Some(source) = store.get_entity::<LightSourceEntity>(handle) else {
                continue;
            };
            if !source.core.active {
                continue;
            }
            if self.lights.len() >= MAX_DYNAMIC_LIGHTS {
                dropped += 1;
                continue;
            }
            self.lights.push(DynamicLight {
                owner: handle,
                ..DynamicLight::new(
                    LightType::Point,
                    source.core.transform.position,
                    source.color,
                    source.intensity,
                )
            });
        }

        if dropped != self.dropped_sources && dropped > 0 {
            log::warn!("{dropped} light sources over the limit of {MAX_DYNAMIC_LIGHTS} ignored");
        }
        self.dropped_sources = dropped;
    }

    /// Light sources the last gather had no room for
    #[must_use]
    pub fn dropped_sources(&self) -> usize {
        self.dropped_sources
    }

    /// Build the GPU uniform
    #[must_use]
    pub fn build_storage(&self) -> LightStorage {
        let mut storage = LightStorage::zeroed();
        storage.ambient = (self.scene.ambient_color * self.scene.ambient_intensity).into();
        storage.sun_direction = self.scene.sun_direction.into();
        storage.sun_color = self.scene.sun_color.into();
        storage.sun_intensity = self.scene.sun_intensity;
        for (slot, light) in storage.lights.iter_mut().zip(&self.lights) {
            *slot = light.to_gpu();
        }
        storage.num_lights = self.lights.len() as u32;
        storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;

    #[test]
    fn test_default_scene() {
        let lighting = LightingSystem::new();
        assert!((lighting.scene.sun_direction.length() - 1.0).abs() < 1e-6);
        assert_eq!(lighting.scene.sun_intensity, 0.4);
    }

    #[test]
    fn test_capacity_limit() {
        let mut lighting = LightingSystem::new();
        for i in 0..MAX_DYNAMIC_LIGHTS {
            assert_eq!(
                lighting.add(DynamicLight::new(LightType::Point, Vec3::ZERO, Vec3::ONE, 1.0)),
                Some(i)
            );
        }
        assert_eq!(
            lighting.add(DynamicLight::new(LightType::Point, Vec3::ZERO, Vec3::ONE, 1.0)),
            None
        );
    }

    #[test]
    fn test_remove_swaps_last_in() {
        let mut lighting = LightingSystem::new();
        for x in 0..3 {
            lighting.add_point_light(
                Vec3::new(x as f32, 0.0, 0.0),
                Vec3::ONE,
                1.0,
                (1.0, 0.09, 0.032),
            );
        }

        lighting.remove(0);
        assert_eq!(lighting.len(), 2);
        assert_eq!(lighting.get(0).unwrap().position.x, 2.0);
        assert!(lighting.remove(5).is_none());
    }

    #[test]
    fn test_gather_light_sources_skips_stale() {
        let mut store = EntityStore::new(16);
        let live = store.add_entity(EntityType::LightSource).unwrap();
        let gone = store.add_entity(EntityType::LightSource).unwrap();
        store
            .get_entity_mut::<LightSourceEntity>(live)
            .unwrap()
            .color = Vec3::new(1.0, 0.0, 0.0);
        store.free_entity(gone);

        let mut lighting = LightingSystem::new();
        lighting.gather_light_sources(&store, &[live, gone]);

        assert_eq!(lighting.len(), 1);
        assert_eq!(lighting.get(0).unwrap().owner, live);
        assert_eq!(lighting.get(0).unwrap().color, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_gather_keeps_direct_lights() {
        let mut store = EntityStore::new(16);
        let source = store.add_entity(EntityType::LightSource).unwrap();

        let mut lighting = LightingSystem::new();
        lighting.add_point_light(Vec3::ZERO, Vec3::ONE, 1.0, (1.0, 0.09, 0.032));
        lighting.gather_light_sources(&store, &[source]);
        lighting.gather_light_sources(&store, &[source]);

        assert_eq!(lighting.len(), 2);
        assert!(!lighting.get(0).unwrap().owner.is_valid());
        assert_eq!(lighting.get(1).unwrap().owner, source);
    }

    #[test]
    fn test_gather_counts_sources_over_limit() {
        let mut store = EntityStore::new(64);
        let sources: Vec<_> = (0..MAX_DYNAMIC_LIGHTS + 8)
            .map(|_| store.add_entity(EntityType::LightSource).unwrap())
            .collect();

        let mut lighting = LightingSystem::new();
        lighting.gather_light_sources(&store, &sources);
        assert_eq!(lighting.len(), MAX_DYNAMIC_LIGHTS);
        assert_eq!(lighting.dropped_sources(), 8);

        // Same overflow on the next frame
        lighting.gather_light_sources(&store, &sources);
        assert_eq!(lighting.dropped_sources(), 8);

        lighting.gather_light_sources(&store, &sources[..4]);
        assert_eq!(lighting.len(), 4);
        assert_eq!(lighting.dropped_sources(), 0);
    }

    #[test]
    fn test_build_storage() {
        let mut lighting = LightingSystem::new();
        lighting.add_spot_light(Vec3::Y, Vec3::new(0.0, -2.0, 0.0), Vec3::ONE, 2.0, (10.0, 20.0));

        let storage = lighting.build_storage();
        assert_eq!(storage.num_lights, 1);
        assert_eq!(storage.lights[0].light_type, LightType::Spot as u32);
        assert_eq!(storage.lights[0].direction, [0.0, -1.0, 0.0]);
        assert!((storage.ambient[2] - 0.03).abs() < 1e-6);
    }
}
