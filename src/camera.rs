use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

const DEFAULT_YAW: f32 = -90.0;
const DEFAULT_FOV: f32 = 45.0;
const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 45.0;
const PITCH_LIMIT: f32 = 89.0;
const MOUSE_SENSITIVITY: f32 = 0.1;

/// Heading applied to the follow offset.  Identity today; kept as a constant
/// so a rotated chase position stays a one-line change.
const FOLLOW_HEADING_DEGREES: f32 = 0.0;

/// Viewport and frustum configuration supplied at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1000,
            near_plane: 0.1,
            far_plane: 100.0,
        }
    }
}

/// Navigation mode; transitions happen only through [`Camera::set_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMode {
    Free,
    Following,
}

/// Continuous movement directions recognised in free-fly mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Viewpoint state machine.
///
/// In `Free` mode keyboard/mouse deltas steer position and yaw/pitch; in
/// `Following` mode the camera tracks a target supplied each frame through
/// [`follow_position`](Self::follow_position) and ignores look/move input.
/// Operations called in the wrong mode are silent no-ops, never errors.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    fov: f32,
    settings: CameraSettings,
    mode: CameraMode,
}

impl Camera {
    pub fn new(settings: CameraSettings, position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: 0.0,
            fov: DEFAULT_FOV,
            settings,
            mode: CameraMode::Free,
        };
        camera.update_vectors();
        camera
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CameraMode) {
        self.mode = mode;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Moves along the front/right basis.  Free mode only; `amount` is
    /// expected to be `speed * delta_time`, computed by the caller.
    pub fn process_keyboard(&mut self, direction: MoveDirection, amount: f32) {
        if self.mode != CameraMode::Free {
            return;
        }
        match direction {
            MoveDirection::Forward => self.position += self.front * amount,
            MoveDirection::Backward => self.position -= self.front * amount,
            MoveDirection::Left => self.position -= self.right * amount,
            MoveDirection::Right => self.position += self.right * amount,
        }
    }

    /// Applies a mouse-look delta.  Free mode only.  Pitch is clamped to
    /// ±89° so the basis never degenerates.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        if self.mode != CameraMode::Free {
            return;
        }
        self.yaw += dx * MOUSE_SENSITIVITY;
        self.pitch = (self.pitch + dy * MOUSE_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    /// Zooms by adjusting the field of view; independent of navigation mode.
    pub fn process_mouse_scroll(&mut self, dy: f32) {
        self.fov = (self.fov - dy).clamp(MIN_FOV, MAX_FOV);
    }

    /// Updates the viewport dimensions used for the projection aspect ratio.
    /// Zero dimensions are ignored.
    pub fn update_screen_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.settings.width = width;
        self.settings.height = height;
    }

    /// Places the camera at a fixed offset from a tracked target with fixed
    /// look angles `(yaw, pitch)` in degrees.  Following mode only; prior
    /// free-look state does not leak into the result.
    pub fn follow_position(&mut self, target_offset: Vec3, camera_offset: Vec3, angles: Vec2) {
        if self.mode != CameraMode::Following {
            return;
        }
        let heading = Quat::from_rotation_y(FOLLOW_HEADING_DEGREES.to_radians());
        self.position = target_offset + heading * camera_offset;
        self.yaw = angles.x;
        self.pitch = angles.y.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    /// Look-at matrix for the current position and orientation.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection for the current fov, aspect and clip planes.
    pub fn projection_matrix(&self) -> Mat4 {
        let aspect = self.settings.width as f32 / self.settings.height as f32;
        Mat4::perspective_rh_gl(
            self.fov.to_radians(),
            aspect,
            self.settings.near_plane,
            self.settings.far_plane,
        )
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(CameraSettings::default(), Vec3::ZERO)
    }

    #[test]
    fn initial_front_faces_negative_z() {
        let cam = camera();
        assert!(cam.front.abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn forward_move_follows_front_vector() {
        let mut cam = camera();
        cam.process_keyboard(MoveDirection::Forward, 1.0);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-6));
    }

    #[test]
    fn pitch_stays_clamped_under_any_input() {
        let mut cam = camera();
        for _ in 0..500 {
            cam.process_mouse_movement(3.0, 40.0);
        }
        assert!(cam.pitch() <= PITCH_LIMIT);
        for _ in 0..500 {
            cam.process_mouse_movement(-3.0, -40.0);
        }
        assert!(cam.pitch() >= -PITCH_LIMIT);
    }

    #[test]
    fn fov_stays_within_configured_range() {
        let mut cam = camera();
        for _ in 0..100 {
            cam.process_mouse_scroll(5.0);
        }
        assert_eq!(cam.fov(), MIN_FOV);
        for _ in 0..100 {
            cam.process_mouse_scroll(-5.0);
        }
        assert_eq!(cam.fov(), MAX_FOV);
    }

    #[test]
    fn basis_remains_orthonormal_after_look_updates() {
        let mut cam = camera();
        for step in 0..200 {
            cam.process_mouse_movement(17.3, if step % 2 == 0 { 9.1 } else { -13.7 });
        }
        assert!((cam.front.length() - 1.0).abs() < 1e-5);
        assert!((cam.up.length() - 1.0).abs() < 1e-5);
        assert!((cam.right.length() - 1.0).abs() < 1e-5);
        assert!(cam.front.dot(cam.up).abs() < 1e-5);
        assert!(cam.front.dot(cam.right).abs() < 1e-5);
        assert!(cam.up.dot(cam.right).abs() < 1e-5);
    }

    #[test]
    fn view_matrix_rotation_block_is_orthonormal() {
        let mut cam = camera();
        cam.process_mouse_movement(123.0, -45.0);
        let view = cam.view_matrix();
        let rot = glam::Mat3::from_mat4(view);
        let product = rot * rot.transpose();
        assert!(product.abs_diff_eq(glam::Mat3::IDENTITY, 1e-5));
    }

    #[test]
    fn free_only_operations_are_noops_while_following() {
        let mut cam = camera();
        cam.set_mode(CameraMode::Following);
        cam.process_keyboard(MoveDirection::Forward, 5.0);
        cam.process_mouse_movement(90.0, 45.0);
        assert_eq!(cam.position(), Vec3::ZERO);
        assert_eq!(cam.yaw(), DEFAULT_YAW);
        assert_eq!(cam.pitch(), 0.0);
    }

    #[test]
    fn follow_position_is_a_noop_in_free_mode() {
        let mut cam = camera();
        cam.follow_position(Vec3::ONE, Vec3::ONE, Vec2::new(30.0, 30.0));
        assert_eq!(cam.position(), Vec3::ZERO);
    }

    #[test]
    fn follow_places_camera_at_offset_with_fixed_angles() {
        let mut cam = camera();
        // Dirty the free-look state first; it must not leak through.
        cam.process_mouse_movement(400.0, 200.0);
        cam.set_mode(CameraMode::Following);
        cam.follow_position(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 5.0),
            Vec2::new(180.0, -10.0),
        );
        assert!(cam.position().abs_diff_eq(Vec3::new(1.0, 2.0, 5.0), 1e-5));
        assert_eq!(cam.yaw(), 180.0);
        assert_eq!(cam.pitch(), -10.0);
    }

    #[test]
    fn zoom_works_in_both_modes() {
        let mut cam = camera();
        cam.set_mode(CameraMode::Following);
        cam.process_mouse_scroll(5.0);
        assert_eq!(cam.fov(), DEFAULT_FOV - 5.0);
    }

    #[test]
    fn screen_size_update_changes_projection_aspect() {
        let mut cam = camera();
        cam.update_screen_size(200, 100);
        let wide = cam.projection_matrix();
        cam.update_screen_size(100, 200);
        let tall = cam.projection_matrix();
        assert_ne!(wide, tall);
        // Zero dimensions are ignored rather than poisoning the aspect ratio.
        cam.update_screen_size(0, 50);
        assert_eq!(cam.projection_matrix(), tall);
    }
}
