//! Procedural meshes: boxes, planes and UV spheres.
//!
//! All generators produce counter-clockwise front faces with outward normals.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{Mesh, ModelVertex};

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn upload(&self, device: &wgpu::Device, name: &str, material: usize) -> Mesh {
        Mesh::new(device, name, &self.vertices, &self.indices, material)
    }

    /// Append one quad centred at `center` spanned by the half axes `u` and `v`.
    /// The quad faces `u × v`.
    fn push_quad(&mut self, center: Vector3<f32>, u: Vector3<f32>, v: Vector3<f32>) {
        let normal = u.cross(v).normalize();
        let base = self.vertices.len() as u32;
        let corners = [
            (center - u - v, [0.0, 1.0]),
            (center + u - v, [1.0, 1.0]),
            (center + u + v, [1.0, 0.0]),
            (center - u + v, [0.0, 0.0]),
        ];
        for (position, tex_coords) in corners {
            self.vertices.push(ModelVertex {
                position: position.into(),
                tex_coords,
                normal: normal.into(),
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Axis aligned box of `size` centred at the origin. 24 vertices so every
/// face gets a flat normal.
pub fn cuboid(size: [f32; 3]) -> MeshData {
    let (hx, hy, hz) = (size[0] * 0.5, size[1] * 0.5, size[2] * 0.5);
    let x = Vector3::new(hx, 0.0, 0.0);
    let y = Vector3::new(0.0, hy, 0.0);
    let z = Vector3::new(0.0, 0.0, hz);
    let mut data = MeshData::default();
    data.push_quad(x, -z, y);
    data.push_quad(-x, z, y);
    data.push_quad(y, x, -z);
    data.push_quad(-y, x, z);
    data.push_quad(z, x, y);
    data.push_quad(-z, -x, y);
    data
}

/// Horizontal plane facing +Y.
pub fn plane(width: f32, depth: f32) -> MeshData {
    let mut data = MeshData::default();
    data.push_quad(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(width * 0.5, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -depth * 0.5),
    );
    data
}

/// UV sphere with `rings` latitude bands and `segments` longitude bands.
///
/// The seam and the poles duplicate vertices so texture coordinates stay
/// continuous.
pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> MeshData {
    let rings = rings.max(2);
    let segments = segments.max(3);
    let mut data = MeshData::default();
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let theta = u * 2.0 * PI;
            let normal = Vector3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            data.vertices.push(ModelVertex {
                position: (normal * radius).into(),
                tex_coords: [u, v],
                normal: normal.into(),
            });
        }
    }
    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            let c = b + 1;
            let d = a + 1;
            data.indices.extend_from_slice(&[a, c, b, a, d, c]);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every non-degenerate triangle must wind counter-clockwise around its
    /// vertex normals.
    fn assert_outward_winding(data: &MeshData) {
        for tri in data.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| data.vertices[i as usize]);
            let pa = Vector3::from(a.position);
            let face = (Vector3::from(b.position) - pa).cross(Vector3::from(c.position) - pa);
            if face.magnitude() < 1e-6 {
                continue;
            }
            let normal = Vector3::from(a.normal) + Vector3::from(b.normal) + Vector3::from(c.normal);
            assert!(face.dot(normal) > 0.0, "triangle {tri:?} winds inwards");
        }
    }

    #[test]
    fn cuboid_counts_and_winding() {
        let cube = cuboid([10.0, 200.0, 10.0]);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_outward_winding(&cube);
        let top = cube.vertices.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert_eq!(top, 100.0);
    }

    #[test]
    fn plane_faces_up() {
        let floor = plane(1000.0, 1000.0);
        assert_eq!(floor.vertices.len(), 4);
        assert_eq!(floor.indices.len(), 6);
        assert!(floor.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert_outward_winding(&floor);
    }

    #[test]
    fn sphere_counts_normals_and_winding() {
        let sphere = uv_sphere(0.5, 16, 24);
        assert_eq!(sphere.vertices.len(), 17 * 25);
        assert_eq!(sphere.indices.len(), 16 * 24 * 6);
        for v in &sphere.vertices {
            assert!((Vector3::from(v.normal).magnitude() - 1.0).abs() < 1e-5);
            assert!((Vector3::from(v.position).magnitude() - 0.5).abs() < 1e-5);
        }
        assert_outward_winding(&sphere);
    }
}
