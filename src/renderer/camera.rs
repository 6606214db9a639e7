use glam::{Mat4, Vec2, Vec3};

const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// Perspective camera orbiting a target point.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,

    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(Vec3::new(-600.0, 550.0, 1300.0), Vec3::ZERO)
    }
}

impl OrbitCamera {
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(f32::EPSILON);
        let dir = offset / distance;

        Self {
            target,
            distance,
            yaw: dir.z.atan2(dir.x),
            pitch: dir.y.clamp(-1.0, 1.0).asin().clamp(-MAX_PITCH, MAX_PITCH),

            fov: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 1.0,
            far: 80000.0,

            rotate_speed: 0.005,
            pan_speed: 0.0015,
            zoom_speed: 0.1,
            min_distance: 10.0,
            max_distance: 40000.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.target
            + self.distance
                * Vec3::new(
                    self.yaw.cos() * self.pitch.cos(),
                    self.pitch.sin(),
                    self.yaw.sin() * self.pitch.cos(),
                )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Orbits around the target by a pointer delta in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        self.yaw += delta.x * self.rotate_speed;
        self.pitch = (self.pitch + delta.y * self.rotate_speed).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Slides the target in the view plane; larger distances pan faster.
    pub fn pan(&mut self, delta: Vec2) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);

        let scale = self.distance * self.pan_speed;
        self.target += (-delta.x * right + delta.y * up) * scale;
    }

    /// Positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        let factor = (1.0 - self.zoom_speed).powf(steps);
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-2
    }

    #[test]
    fn starts_at_the_given_eye() {
        let camera = OrbitCamera::default();
        assert!(approx(camera.position(), Vec3::new(-600.0, 550.0, 1300.0)));
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn rotate_keeps_distance() {
        let mut camera = OrbitCamera::default();
        let before = camera.position().distance(camera.target);
        camera.rotate(Vec2::new(120.0, -40.0));
        assert!((camera.position().distance(camera.target) - before).abs() < 1e-2);
    }

    #[test]
    fn pitch_stops_short_of_the_pole() {
        let mut camera = OrbitCamera::default();
        camera.rotate(Vec2::new(0.0, 1.0e6));
        assert!(camera.pitch <= MAX_PITCH);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut camera = OrbitCamera::default();
        let offset = camera.position() - camera.target;
        camera.pan(Vec2::new(30.0, 10.0));
        assert_ne!(camera.target, Vec3::ZERO);
        assert!(approx(camera.position() - camera.target, offset));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = OrbitCamera::default();
        let start = camera.distance;
        camera.zoom(1.0);
        assert!(camera.distance < start);
        camera.zoom(1000.0);
        assert_eq!(camera.distance, camera.min_distance);
        camera.zoom(-1000.0);
        assert_eq!(camera.distance, camera.max_distance);
    }

    #[test]
    fn aspect_ignores_zero_height() {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(800.0, 400.0);
        assert_eq!(camera.aspect, 2.0);
        camera.set_aspect(800.0, 0.0);
        assert_eq!(camera.aspect, 2.0);
    }
}
