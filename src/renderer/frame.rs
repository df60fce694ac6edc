//! Frame driver
//!
//! Runs one frame against a [`FrameBackend`]:
//!
//! 1. wait until the GPU is done with the frame slot, then acquire an image
//! 2. record: upload dirty instance tables into the slot's buffers and issue
//!    one instanced draw per (mesh, material) batch
//! 3. submit and present, then advance the frame counter
//!
//! An out-of-date or suboptimal surface at acquire recreates the swapchain and
//! skips the frame. Any other backend error is returned and is fatal.

use thiserror::Error;

use super::camera::CameraUniform;
use super::instances::{DrawBatch, InstancedData};
use super::lights::LightStorage;
use super::material::{Material, MaterialLibrary};
use super::mesh::{Mesh, MeshLibrary};
use crate::memory::FrameArena;

/// Default number of frames the CPU may record ahead of the GPU
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Unrecoverable renderer errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(wgpu::SurfaceError),
    #[error("frame slot {slot} out of range ({frames_in_flight} frames in flight)")]
    BadSlot { slot: usize, frames_in_flight: usize },
    #[error("{0} called outside of frame recording")]
    NotRecording(&'static str),
}

/// Result of acquiring the next surface image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    Ready,
    /// Usable but no longer matches the surface
    Suboptimal,
    /// Surface changed; nothing can be drawn this frame
    OutOfDate,
}

/// Result of presenting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Uniforms shared by every draw of a frame
#[derive(Debug, Clone, Copy)]
pub struct FrameGlobals {
    pub camera: CameraUniform,
    pub lights: LightStorage,
}

/// GPU operations the driver needs
pub trait FrameBackend {
    /// Block until the last submission that used `slot` has completed
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), FrameError>;

    fn acquire_image(&mut self) -> Result<AcquireStatus, FrameError>;

    /// Rebuild the swapchain and size-dependent targets
    fn recreate_swapchain(&mut self);

    /// Start the command stream and render pass for `slot`
    fn begin_recording(&mut self, slot: usize, globals: &FrameGlobals) -> Result<(), FrameError>;

    /// Copy `instances` into `mesh`'s buffer for `slot`
    fn upload_instances(&mut self, slot: usize, mesh: &Mesh, instances: &[InstancedData]);

    /// Record one instanced draw
    fn draw(&mut self, slot: usize, mesh: &Mesh, material: &Material, batch: DrawBatch);

    fn submit_and_present(&mut self, slot: usize) -> Result<PresentStatus, FrameError>;
}

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Recording,
}

/// What happened during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame counter value the frame ran with
    pub frame: u64,
    pub slot: usize,
    /// The surface was recreated and nothing was drawn
    pub skipped: bool,
    pub draw_calls: u32,
    pub instances: u32,
    /// Meshes whose instance buffer was rewritten
    pub uploads: u32,
    pub uploaded_bytes: usize,
}

/// Frame lifecycle state machine
#[derive(Debug)]
pub struct FrameDriver {
    frames_in_flight: usize,
    frame_counter: u64,
    state: FrameState,
}

impl FrameDriver {
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1),
            frame_counter: 0,
            state: FrameState::Idle,
        }
    }

    /// Frame slot the next frame will use
    #[inline]
    pub fn current_slot(&self) -> usize {
        (self.frame_counter % self.frames_in_flight as u64) as usize
    }

    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Run one frame
    pub fn run_frame<B: FrameBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        meshes: &mut MeshLibrary,
        materials: &MaterialLibrary,
        arena: &mut FrameArena,
        globals: &FrameGlobals,
    ) -> Result<FrameReport, FrameError> {
        let slot = self.current_slot();
        let mut report = FrameReport {
            frame: self.frame_counter,
            slot,
            ..FrameReport::default()
        };

        // Instance buffers for this slot may be rewritten only after this.
        backend.wait_for_slot(slot)?;

        match backend.acquire_image()? {
            AcquireStatus::Ready => {}
            status => {
                log::debug!("surface {status:?} at acquire, recreating swapchain");
                backend.recreate_swapchain();
                report.skipped = true;
                return Ok(report);
            }
        }

        self.state = FrameState::Recording;
        arena.reset();
        backend.begin_recording(slot, globals)?;

        for (id, mesh) in meshes.iter_mut() {
            if let Some(staged) = mesh.instances.prepare_upload(slot, arena) {
                backend.upload_instances(slot, mesh, staged);
                report.uploads += 1;
                report.uploaded_bytes += std::mem::size_of_val(staged);
            }
            if mesh.instances.is_empty() {
                continue;
            }

            for &batch in mesh.instances.batches() {
                let Some(material) = materials.get(batch.material) else {
                    log::warn!("{id} references unknown {}, batch skipped", batch.material);
                    continue;
                };
                backend.draw(slot, mesh, material, batch);
                report.draw_calls += 1;
                report.instances += batch.instance_count;
            }
        }

        let presented = backend.submit_and_present(slot);
        self.state = FrameState::Idle;
        match presented? {
            PresentStatus::Presented => {}
            status => {
                log::debug!("surface {status:?} at present, recreating swapchain");
                backend.recreate_swapchain();
            }
        }

        self.frame_counter += 1;
        Ok(report)
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(DEFAULT_FRAMES_IN_FLIGHT)
    }
}
