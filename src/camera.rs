//! Cameras and the camera uniform shared by every demo.
//!
//! All cameras work in a right-handed world space with +Y up. Projection
//! matrices are built with cgmath (OpenGL clip conventions) and converted to
//! wgpu's 0..1 depth range with [`OPENGL_TO_WGPU_MATRIX`].

use cgmath::{EuclideanSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, Vector4};

use crate::input::InputState;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Mouse drag sensitivity (radians per pixel) of the arcball camera.
pub const MOUSE_PAN_SENSITIVITY: f32 = 0.008;

/// wgpu-style perspective projection (depth mapped to `0..1`).
pub fn perspective(fov: Rad<f32>, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(fov, aspect, near, far)
}

/// wgpu-style orthographic projection. `near`/`far` are distances along the
/// view direction (-Z in view space), depth is mapped to `0..1`.
pub fn orthographic(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::ortho(left, right, bottom, top, near, far)
}

/// The eight world-space corners of the frustum described by `view_proj`.
///
/// The corners are obtained by pushing the wgpu NDC cube (`x, y` in `-1..1`,
/// `z` in `0..1`) through the inverse view-projection. Near corners come
/// first, in the order `(-x,-y) (-x,+y) (+x,-y) (+x,+y)`.
pub fn frustum_corners_world_space(view_proj: Matrix4<f32>) -> Option<[Vector4<f32>; 8]> {
    let inverse = view_proj.invert()?;
    let mut corners = [Vector4::new(0.0, 0.0, 0.0, 1.0); 8];
    let mut i = 0;
    for z in [0.0, 1.0] {
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                let pt = inverse * Vector4::new(x, y, z, 1.0);
                corners[i] = pt / pt.w;
                i += 1;
            }
        }
    }
    Some(corners)
}

/// Everything the shaders know about the camera.
///
/// Mirrors `CameraUniform` in the WGSL sources: `position.w` and
/// `near_far.zw` are padding.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
    pub near_far: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view: Matrix4::identity().into(),
            projection: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
            position: [0.0; 4],
            near_far: [0.0; 4],
        }
    }

    pub fn update(&mut self, camera: &dyn Camera) {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        self.view = view.into();
        self.projection = projection.into();
        self.view_proj = (projection * view).into();
        let position = camera.position();
        self.position = [position.x, position.y, position.z, 1.0];
        let (near, far) = camera.near_far();
        self.near_far = [near, far, 0.0, 0.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Common camera interface used to fill a [`CameraUniform`].
pub trait Camera {
    fn view_matrix(&self) -> Matrix4<f32>;
    fn projection_matrix(&self) -> Matrix4<f32>;
    fn position(&self) -> Point3<f32>;
    fn near_far(&self) -> (f32, f32);

    /// Resize the viewport the camera renders into.
    fn resize(&mut self, width: u32, height: u32);
}

/// Orbits `target` at `distance`. Dragging with the left mouse button rotates,
/// the scroll wheel accumulates a zoom offset that is added to the initial
/// distance.
///
/// `rotation.x` is the polar angle: negative values lift the camera above the
/// target. `rotation.y` is the azimuth.
#[derive(Debug, Clone)]
pub struct ArcballCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub rotation: Vector3<f32>,
    pub aspect: f32,
    pub fov: Rad<f32>,
    pub near: f32,
    pub far: f32,
    pub distance: f32,
    orig_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl ArcballCamera {
    pub fn new(distance: f32) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            target: Point3::origin(),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            aspect: 1.0,
            fov: cgmath::Deg(70.0).into(),
            near: 0.1,
            far: 100.0,
            distance,
            orig_distance: distance,
            min_distance: 1.0,
            max_distance: 1000.0,
            min_polar_angle: -std::f32::consts::FRAC_PI_2,
            max_polar_angle: std::f32::consts::FRAC_PI_2,
        };
        camera.update_position();
        camera
    }

    /// Apply this frame's input. `zoom` is the accumulated zoom offset in
    /// world units.
    pub fn update(&mut self, input: &InputState, zoom: f32) {
        self.distance = (self.orig_distance + zoom).clamp(self.min_distance, self.max_distance);

        if input.left_mouse_down {
            self.rotation.x += input.mouse_delta.y * MOUSE_PAN_SENSITIVITY;
            self.rotation.y += input.mouse_delta.x * MOUSE_PAN_SENSITIVITY;
        }
        self.update_position();
    }

    fn update_position(&mut self) {
        self.rotation.x = self
            .rotation
            .x
            .clamp(self.min_polar_angle, self.max_polar_angle);
        let rotate = Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_x(Rad(-self.rotation.x));
        let offset = rotate * Vector4::new(0.0, 0.0, -self.distance, 0.0);
        self.position = self.target + offset.truncate();
    }

    /// Perspective projection for an arbitrary depth slice of this camera.
    pub fn projection_for(&self, near: f32, far: f32) -> Matrix4<f32> {
        perspective(self.fov, self.aspect, near, far)
    }
}

impl Camera for ArcballCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        if self.position == self.target {
            Matrix4::from_translation(-self.target.to_vec())
        } else {
            Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
        }
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection_for(self.near, self.far)
    }

    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn near_far(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }
}

/// Pixel-space orthographic camera: `(0, 0)` is the top-left corner of the
/// viewport and `(width, height)` the bottom-right one.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    pub position: Point3<f32>,
    pub width: f32,
    pub height: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrthographicCamera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 1.0),
            width: 1.0,
            height: 1.0,
            near: 0.1,
            far: 10.0,
        }
    }
}

impl Camera for OrthographicCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(-self.position.to_vec())
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        orthographic(0.0, self.width, self.height, 0.0, self.near, self.far)
    }

    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn near_far(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, MetricSpace};

    use super::*;

    fn dragging(dx: f32, dy: f32) -> InputState {
        let mut input = InputState::default();
        input.left_mouse_down = true;
        input.mouse_delta = cgmath::Vector2::new(dx, dy);
        input
    }

    #[test]
    fn arcball_keeps_its_distance_to_the_target() {
        let mut camera = ArcballCamera::new(5.0);
        camera.update(&dragging(40.0, -25.0), 0.0);
        assert!((camera.position.distance(camera.target) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn arcball_clamps_zoom_and_polar_angle() {
        let mut camera = ArcballCamera::new(300.0);
        camera.max_distance = 700.0;
        camera.max_polar_angle = -0.1;

        camera.update(&dragging(0.0, 10_000.0), 10_000.0);
        assert_eq!(camera.distance, 700.0);
        assert_eq!(camera.rotation.x, -0.1);
        // a negative polar angle keeps the camera above the target
        assert!(camera.position.y > 0.0);

        camera.update(&InputState::default(), -10_000.0);
        assert_eq!(camera.distance, camera.min_distance);
    }

    #[test]
    fn arcball_ignores_drag_without_button() {
        let mut camera = ArcballCamera::new(3.0);
        let before = camera.position;
        let mut input = dragging(100.0, 100.0);
        input.left_mouse_down = false;
        camera.update(&input, 0.0);
        assert_eq!(before, camera.position);
    }

    #[test]
    fn frustum_corners_match_the_analytic_frustum() {
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        let view_proj = perspective(Deg(90.0).into(), 1.0, 1.0, 10.0) * view;
        let corners = frustum_corners_world_space(view_proj).unwrap();
        // with a 90° fov and aspect 1 the half extent equals the distance
        for corner in &corners[..4] {
            assert!((corner.z + 1.0).abs() < 1e-4);
            assert!((corner.x.abs() - 1.0).abs() < 1e-3);
            assert!((corner.y.abs() - 1.0).abs() < 1e-3);
        }
        for corner in &corners[4..] {
            assert!((corner.z + 10.0).abs() < 1e-2);
            assert!((corner.x.abs() - 10.0).abs() < 1e-2);
            assert!((corner.y.abs() - 10.0).abs() < 1e-2);
        }
    }

    #[test]
    fn orthographic_camera_maps_pixels_to_clip_space() {
        let mut camera = OrthographicCamera::default();
        camera.resize(800, 600);
        let view_proj = camera.projection_matrix() * camera.view_matrix();
        let top_left = view_proj * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = view_proj * Vector4::new(800.0, 600.0, 0.0, 1.0);
        assert!((top_left.x + 1.0).abs() < 1e-5 && (top_left.y - 1.0).abs() < 1e-5);
        assert!((bottom_right.x - 1.0).abs() < 1e-5 && (bottom_right.y + 1.0).abs() < 1e-5);
        assert!(top_left.z >= 0.0 && top_left.z <= 1.0);
    }
}
