//! Omnidirectional (point light) shadow cube faces.
//!
//! A point light renders the scene six times, once per cube face, with a 90°
//! square perspective. The face order and orientation follow the cube map
//! addressing rules so the resulting depth cube can be sampled with the world
//! space direction from the light to the shaded point.

use cgmath::{Deg, Matrix4, Point3, Vector3};

use crate::camera::perspective;

/// Negates clip space y. Cube faces are addressed with `t` growing downwards
/// while the look-at bases below are right-handed with y up.
#[rustfmt::skip]
const FLIP_Y: Matrix4<f32> = Matrix4::new(
    1.0,  0.0, 0.0, 0.0,
    0.0, -1.0, 0.0, 0.0,
    0.0,  0.0, 1.0, 0.0,
    0.0,  0.0, 0.0, 1.0,
);

#[derive(Debug, Clone, Copy)]
pub struct CubeFace {
    pub direction: Vector3<f32>,
    pub up: Vector3<f32>,
}

/// Faces in cube layer order: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBE_FACES: [CubeFace; 6] = [
    CubeFace {
        direction: Vector3::new(1.0, 0.0, 0.0),
        up: Vector3::new(0.0, -1.0, 0.0),
    },
    CubeFace {
        direction: Vector3::new(-1.0, 0.0, 0.0),
        up: Vector3::new(0.0, -1.0, 0.0),
    },
    CubeFace {
        direction: Vector3::new(0.0, 1.0, 0.0),
        up: Vector3::new(0.0, 0.0, 1.0),
    },
    CubeFace {
        direction: Vector3::new(0.0, -1.0, 0.0),
        up: Vector3::new(0.0, 0.0, -1.0),
    },
    CubeFace {
        direction: Vector3::new(0.0, 0.0, 1.0),
        up: Vector3::new(0.0, -1.0, 0.0),
    },
    CubeFace {
        direction: Vector3::new(0.0, 0.0, -1.0),
        up: Vector3::new(0.0, -1.0, 0.0),
    },
];

/// View-projection for rendering cube layer `face` of a light at `position`.
pub fn face_view_proj(position: Point3<f32>, face: &CubeFace, near: f32, far: f32) -> Matrix4<f32> {
    let view = Matrix4::look_at_rh(position, position + face.direction, face.up);
    FLIP_Y * perspective(Deg(90.0).into(), 1.0, near, far) * view
}

/// All six face matrices in layer order.
pub fn cube_view_projs(position: Point3<f32>, near: f32, far: f32) -> [Matrix4<f32>; 6] {
    CUBE_FACES.map(|face| face_view_proj(position, &face, near, far))
}

#[cfg(test)]
mod tests {
    use cgmath::{EuclideanSpace, Vector4};

    use super::*;

    /// Face index and `(s, t)` for a direction, following the cube map
    /// major axis table.
    fn cube_address(d: Vector3<f32>) -> (usize, f32, f32) {
        let (ax, ay, az) = (d.x.abs(), d.y.abs(), d.z.abs());
        let (face, sc, tc, ma) = if ax >= ay && ax >= az {
            if d.x > 0.0 {
                (0, -d.z, -d.y, ax)
            } else {
                (1, d.z, -d.y, ax)
            }
        } else if ay >= az {
            if d.y > 0.0 {
                (2, d.x, d.z, ay)
            } else {
                (3, d.x, -d.z, ay)
            }
        } else if d.z > 0.0 {
            (4, d.x, -d.y, az)
        } else {
            (5, -d.x, -d.y, az)
        };
        (face, (sc / ma + 1.0) * 0.5, (tc / ma + 1.0) * 0.5)
    }

    #[test]
    fn face_directions_project_to_face_centres() {
        let light = Point3::new(0.3, -0.2, 0.1);
        for (i, m) in cube_view_projs(light, 0.01, 2.0).iter().enumerate() {
            let p = *m * (light.to_vec() + CUBE_FACES[i].direction * 0.5).extend(1.0);
            let p = p / p.w;
            assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5, "face {i}: {p:?}");
            assert!(p.z > 0.0 && p.z < 1.0);
        }
    }

    #[test]
    fn rendered_faces_match_cube_map_addressing() {
        let light = Point3::new(1.0, 2.0, -3.0);
        let matrices = cube_view_projs(light, 0.05, 10.0);
        let directions = [
            Vector3::new(1.0, 0.3, -0.6),
            Vector3::new(-1.0, -0.5, 0.2),
            Vector3::new(0.4, 1.0, 0.7),
            Vector3::new(-0.2, -1.0, 0.8),
            Vector3::new(0.6, -0.1, 1.0),
            Vector3::new(-0.7, 0.45, -1.0),
        ];
        for d in directions {
            let (face, s, t) = cube_address(d);
            let world = Vector4::new(light.x + d.x, light.y + d.y, light.z + d.z, 1.0);
            let clip = matrices[face] * world;
            let ndc = clip / clip.w;
            // render target texel space: x right, y down
            let (u, v) = ((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5);
            assert!((u - s).abs() < 1e-4, "face {face}: u {u} != s {s}");
            assert!((v - t).abs() < 1e-4, "face {face}: v {v} != t {t}");
        }
    }
}
