//! Perspective camera and its free-fly controller

use glam::{Mat4, Vec3};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::input::{Input, InputDevice};

/// GPU-side camera data
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view_pos: [f32; 3],
    _padding: f32,
}

/// Perspective camera
///
/// Orientation is stored as yaw and pitch in degrees; `direction` is derived
/// from them.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    direction: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Width / height
    pub aspect: f32,
    yaw: f32,
    pitch: f32,
}

impl Camera {
    /// Largest pitch magnitude in degrees
    pub const PITCH_LIMIT: f32 = 89.0;

    pub fn new() -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 2.0, 8.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: 60.0,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
            yaw: -90.0,
            pitch: 0.0,
        };
        camera.update_direction();
        camera
    }

    /// Camera at `position` looking towards `target`
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self::new();
        camera.position = position;
        let direction = (target - position).normalize_or(Vec3::NEG_Z);
        camera.yaw = direction.z.atan2(direction.x).to_degrees();
        camera.pitch = direction
            .y
            .asin()
            .to_degrees()
            .clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        camera.update_direction();
        camera
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.direction, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            view_pos: self.position.into(),
            _padding: 0.0,
        }
    }

    /// Update aspect ratio from a surface size
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Turn by yaw/pitch offsets in degrees. Pitch is clamped.
    pub fn rotate(&mut self, yaw_degrees: f32, pitch_degrees: f32) {
        self.yaw += yaw_degrees;
        self.pitch =
            (self.pitch + pitch_degrees).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.update_direction();
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.direction
    }

    pub fn right(&self) -> Vec3 {
        self.direction.cross(self.up).normalize()
    }

    fn update_direction(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.direction = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// WASD/QE movement with right-mouse look
#[derive(Debug, Clone, Copy)]
pub struct FlyCamera {
    /// Units per second
    pub move_speed: f32,
    /// Degrees per pixel of mouse motion
    pub look_sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            move_speed: 15.0,
            look_sensitivity: 0.1,
        }
    }
}

impl FlyCamera {
    /// Apply one frame of input to `camera`
    pub fn update(&self, camera: &mut Camera, input: &Input, dt: f32) {
        let held = |key: KeyCode| input.held(InputDevice::Keyboard, key);
        let step = self.move_speed * dt;
        let forward = camera.forward();
        let right = camera.right();

        let mut offset = Vec3::ZERO;
        if held(KeyCode::KeyW) {
            offset += forward;
        }
        if held(KeyCode::KeyS) {
            offset -= forward;
        }
        if held(KeyCode::KeyD) {
            offset += right;
        }
        if held(KeyCode::KeyA) {
            offset -= right;
        }
        if held(KeyCode::KeyE) {
            offset += Vec3::Y;
        }
        if held(KeyCode::KeyQ) {
            offset -= Vec3::Y;
        }
        camera.position += offset * step;

        if input.is_mouse_button_pressed(MouseButton::Right) {
            let delta = input.mouse_delta() * self.look_sensitivity;
            camera.rotate(delta.x, -delta.y);
        }
    }
}
