use crate::engine::utils::math::{
    mat4x4_look_at, vec3_add, vec3_cross, vec3_normalize, vec3_scale, vec3_sub, Mat4x4, Vec3,
};

// Default camera parameters.
pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
pub const SPEED: f32 = 2.5;
pub const SENSITIVITY: f32 = 0.1;
pub const ZOOM: f32 = 45.0;

const PITCH_LIMIT: f32 = 89.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub world_up: Vec3,

    /// Degrees.
    pub yaw: f32,
    /// Degrees.
    pub pitch: f32,

    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
            right: [1.0, 0.0, 0.0],
            world_up: [0.0, 1.0, 0.0],
            yaw,
            pitch,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: ZOOM,
        };
        camera.update_camera_vectors();
        camera
    }

    pub fn view_matrix(&self) -> Mat4x4 {
        mat4x4_look_at(self.position, vec3_add(self.position, self.front), self.up)
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => {
                self.position = vec3_add(self.position, vec3_scale(self.front, velocity));
            }
            CameraMovement::Backward => {
                self.position = vec3_sub(self.position, vec3_scale(self.front, velocity));
            }
            CameraMovement::Left => {
                self.position = vec3_sub(self.position, vec3_scale(self.right, velocity));
            }
            CameraMovement::Right => {
                self.position = vec3_add(self.position, vec3_scale(self.right, velocity));
            }
        }
    }

    pub fn process_mouse_movement(&mut self, xoffset: f32, yoffset: f32, constrain_pitch: bool) {
        self.yaw += xoffset * self.mouse_sensitivity;
        self.pitch += yoffset * self.mouse_sensitivity;

        // Keep the basis away from the poles, otherwise front and world_up
        // become collinear and the view flips.
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_camera_vectors();
    }

    pub fn process_mouse_scroll(&mut self, yoffset: f32) {
        self.zoom = (self.zoom - yoffset).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn update_camera_vectors(&mut self) {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();

        self.front = vec3_normalize([
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        ]);
        self.right = vec3_normalize(vec3_cross(self.front, self.world_up));
        self.up = vec3_normalize(vec3_cross(self.right, self.front));
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0], YAW, PITCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::utils::math::vec3_dot;

    fn assert_orthonormal(camera: &Camera) {
        let basis = [camera.front, camera.right, camera.up];
        for v in basis {
            let len = vec3_dot(v, v).sqrt();
            assert!((len - 1.0).abs() < 1e-5, "basis vector not unit length: {:?}", v);
        }
        assert!(vec3_dot(camera.front, camera.right).abs() < 1e-5);
        assert!(vec3_dot(camera.front, camera.up).abs() < 1e-5);
        assert!(vec3_dot(camera.right, camera.up).abs() < 1e-5);
    }

    #[test]
    fn default_faces_negative_z() {
        let camera = Camera::default();
        assert!((camera.front[2] + 1.0).abs() < 1e-5);
        assert_orthonormal(&camera);
    }

    #[test]
    fn basis_stays_orthonormal_under_input() {
        let mut camera = Camera::new([0.25, 1.25, 6.75], YAW, -10.0);
        for i in 0..200 {
            camera.process_mouse_movement((i % 17) as f32 - 8.0, (i % 11) as f32 - 5.0, true);
            camera.process_keyboard(CameraMovement::Forward, 0.016);
            camera.process_keyboard(CameraMovement::Left, 0.016);
        }
        assert_orthonormal(&camera);
    }

    #[test]
    fn pitch_clamps_at_limit() {
        let mut camera = Camera::default();
        // Sensitivity 0.1, so 10000 units of mouse travel is 1000 degrees.
        camera.process_mouse_movement(0.0, 10000.0, true);
        assert_eq!(camera.pitch, 89.0);
        camera.process_mouse_movement(0.0, -30000.0, true);
        assert_eq!(camera.pitch, -89.0);
    }

    #[test]
    fn pitch_unconstrained_exceeds_limit() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 10000.0, false);
        assert!(camera.pitch > 89.0);
    }

    #[test]
    fn keyboard_moves_along_front() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Forward, 1.0);
        assert!((camera.position[2] + SPEED).abs() < 1e-5);
        assert!(camera.position[0].abs() < 1e-5);
    }

    #[test]
    fn scroll_clamps_zoom() {
        let mut camera = Camera::default();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom, 1.0);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom, 45.0);
    }

    #[test]
    fn view_matrix_places_eye_at_origin() {
        let camera = Camera::new([1.0, 2.0, 3.0], YAW, 0.0);
        let view = camera.view_matrix();
        let p = crate::engine::utils::math::mat4x4_transform_point(&view, camera.position);
        for c in p {
            assert!(c.abs() < 1e-5);
        }
    }
}
