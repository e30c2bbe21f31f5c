//! The scene's fly camera.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Yaw/pitch perspective camera.
///
/// Angles are stored in degrees. The serialized fields form the fixed
/// camera block of the binary scene format; the matrices are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    flags: u32,
    near: f32,
    far: f32,
    fovy: f32,
    width: u32,
    height: u32,
    pitch: f32,
    yaw: f32,
    position: Vec3,

    #[serde(skip)]
    front: Vec3,
    #[serde(skip)]
    right: Vec3,
    #[serde(skip)]
    view_matrix: Mat4,
    #[serde(skip)]
    projection_matrix: Mat4,
    #[serde(skip)]
    projection_view_matrix: Mat4,
}

impl Default for Camera {
    /// An inactive camera block, written when a scene has no camera.
    fn default() -> Self {
        Self {
            flags: 0,
            near: 0.1,
            far: 100.0,
            fovy: 50.0,
            width: 0,
            height: 0,
            pitch: 0.0,
            yaw: 0.0,
            position: Vec3::ZERO,
            front: Vec3::NEG_Z,
            right: Vec3::X,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            projection_view_matrix: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub const DIRTY: u32 = 1 << 0;
    /// Set on cameras that belong to a scene; the default block lacks it.
    pub const ACTIVE: u32 = 1 << 1;

    const UP: Vec3 = Vec3::Y;

    /// An active camera looking down -Z from `(0, 4, 10)`, tilted 10° down.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            flags: Self::ACTIVE | Self::DIRTY,
            width,
            height,
            pitch: -10.0,
            yaw: -90.0,
            position: Vec3::new(0.0, 4.0, 10.0),
            ..Default::default()
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.flags & Self::DIRTY != 0
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            self.flags |= Self::DIRTY;
        } else {
            self.flags &= !Self::DIRTY;
        }
    }

    pub fn is_active(&self) -> bool {
        self.flags & Self::ACTIVE != 0
    }

    /// Recompute the basis and matrices if dirty. Returns whether it did.
    pub fn update(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }

        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.right = self.front.cross(Self::UP);

        self.view_matrix = Mat4::look_at_rh(self.position, self.position + self.front, Self::UP);
        self.projection_matrix =
            Mat4::perspective_rh(self.fovy.to_radians(), self.aspect(), self.near, self.far);
        self.projection_view_matrix = self.projection_matrix * self.view_matrix;

        self.set_dirty(false);
        true
    }

    pub fn set_dimension(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.set_dirty(true);
        }
    }

    /// Width over height; 1 while the viewport is unsized.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_near_far(&mut self, near: f32, far: f32) {
        assert!(0.0 < near && near < far, "camera planes must satisfy 0 < near < far");
        self.near = near;
        self.far = far;
        self.set_dirty(true);
    }

    /// Vertical field of view in degrees.
    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    pub fn set_fovy(&mut self, degrees: f32) {
        self.fovy = degrees;
        self.set_dirty(true);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn set_pitch_yaw(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch.clamp(-89.0, 89.0);
        self.yaw = yaw;
        self.set_dirty(true);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.set_dirty(true);
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    pub fn projection_view_matrix(&self) -> &Mat4 {
        &self.projection_view_matrix
    }

    /// Mark dirty after being read back so matrices are rebuilt.
    pub(crate) fn on_deserialized(&mut self) {
        self.set_dirty(true);
    }
}
