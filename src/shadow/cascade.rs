//! Cascaded shadow map frustum splitting.
//!
//! The camera frustum is cut along its view depth into consecutive slices.
//! For every slice an orthographic light projection is fitted around the
//! slice's eight corners as seen from the sun, so that each shadow map layer
//! spends its resolution on the part of the scene it covers.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4, Zero};

use crate::camera::{frustum_corners_world_space, orthographic, perspective};

/// Number of layers in the cascade shadow texture.
pub const MAX_CASCADES: usize = 4;

#[derive(Debug, Clone)]
pub struct CascadeSettings {
    /// View depths where one cascade ends and the next begins.
    pub split_distances: Vec<f32>,
    /// Extends the light space depth range so casters outside the slice
    /// still land in the shadow map.
    pub z_mult: f32,
    /// Offset from the slice centroid to the light camera.
    pub sun_position: Vector3<f32>,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            split_distances: vec![200.0, 670.0, 1250.0],
            z_mult: 4.0,
            sun_position: Vector3::new(700.0, 600.0, 500.0),
        }
    }
}

/// One depth slice of the camera frustum and the matrix used to render and
/// sample its shadow map layer.
#[derive(Debug, Clone, Copy)]
pub struct Cascade {
    pub near: f32,
    pub far: f32,
    pub light_space: Matrix4<f32>,
}

/// Partition `[near, far]` at the split distances.
///
/// `k` splits produce `k + 1` cascades: `[near, s0], [s0, s1], ..., [s(k-1), far]`.
pub fn cascade_ranges(near: f32, far: f32, splits: &[f32]) -> anyhow::Result<Vec<(f32, f32)>> {
    anyhow::ensure!(
        near > 0.0 && near < far,
        "invalid camera depth range {near}..{far}"
    );
    anyhow::ensure!(
        splits.len() < MAX_CASCADES,
        "{} split distances need {} cascades, at most {MAX_CASCADES} are supported",
        splits.len(),
        splits.len() + 1
    );
    let mut ranges = Vec::with_capacity(splits.len() + 1);
    let mut start = near;
    for &split in splits {
        anyhow::ensure!(
            split > start && split < far,
            "split distance {split} must lie in ({start}, {far})"
        );
        ranges.push((start, split));
        start = split;
    }
    ranges.push((start, far));
    Ok(ranges)
}

/// Push the light space depth bounds outwards by `z_mult`.
///
/// View space depths are negative in front of the light, so the sign decides
/// whether multiplying or dividing moves a bound away from the slice.
pub fn expand_z(min_z: f32, max_z: f32, z_mult: f32) -> (f32, f32) {
    let min_z = if min_z < 0.0 {
        min_z * z_mult
    } else {
        min_z / z_mult
    };
    let max_z = if max_z < 0.0 {
        max_z / z_mult
    } else {
        max_z * z_mult
    };
    (min_z, max_z)
}

/// Axis aligned bounds of a set of points, in light view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBounds {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl LightBounds {
    pub fn from_points(light_view: Matrix4<f32>, corners: &[Vector4<f32>]) -> Self {
        let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
        for corner in corners {
            let p = light_view * corner;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Self { min, max }
    }
}

/// Light view looking from `centroid + sun_position` at the centroid of the
/// given corners.
pub fn light_view_for(corners: &[Vector4<f32>; 8], sun_position: Vector3<f32>) -> Matrix4<f32> {
    let mut center = Vector3::zero();
    for corner in corners {
        center += corner.truncate();
    }
    center /= corners.len() as f32;
    let center = Point3::new(center.x, center.y, center.z);
    let mut up = Vector3::unit_y();
    if sun_position.normalize().y.abs() > 0.999 {
        up = Vector3::unit_z();
    }
    Matrix4::look_at_rh(center + sun_position, center, up)
}

/// Fit the light space matrix for the frustum slice described by `slice_view_proj`.
pub fn light_space_matrix(
    slice_view_proj: Matrix4<f32>,
    sun_position: Vector3<f32>,
    z_mult: f32,
) -> Option<Matrix4<f32>> {
    let corners = frustum_corners_world_space(slice_view_proj)?;
    let light_view = light_view_for(&corners, sun_position);
    let bounds = LightBounds::from_points(light_view, &corners);
    let (min_z, max_z) = expand_z(bounds.min.z, bounds.max.z, z_mult);

    // view space looks down -Z: the closest depth is the largest z
    let projection = orthographic(
        bounds.min.x,
        bounds.max.x,
        bounds.min.y,
        bounds.max.y,
        -max_z,
        -min_z,
    );
    Some(projection * light_view)
}

/// Compute every cascade for a perspective camera.
#[allow(clippy::too_many_arguments)]
pub fn compute_cascades(
    view: Matrix4<f32>,
    fov: Rad<f32>,
    aspect: f32,
    near: f32,
    far: f32,
    settings: &CascadeSettings,
) -> anyhow::Result<Vec<Cascade>> {
    cascade_ranges(near, far, &settings.split_distances)?
        .into_iter()
        .map(|(slice_near, slice_far)| -> anyhow::Result<Cascade> {
            let slice_proj = perspective(fov, aspect, slice_near, slice_far);
            let light_space =
                light_space_matrix(slice_proj * view, settings.sun_position, settings.z_mult)
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "camera frustum {slice_near}..{slice_far} is not invertible"
                        )
                    })?;
            Ok(Cascade {
                near: slice_near,
                far: slice_far,
                light_space,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use cgmath::Deg;

    use super::*;

    #[test]
    fn ranges_partition_the_depth_range() {
        let ranges = cascade_ranges(1.0, 1500.0, &[200.0, 670.0, 1250.0]).unwrap();
        assert_eq!(
            ranges,
            vec![
                (1.0, 200.0),
                (200.0, 670.0),
                (670.0, 1250.0),
                (1250.0, 1500.0)
            ]
        );
        assert_eq!(cascade_ranges(1.0, 10.0, &[]).unwrap(), vec![(1.0, 10.0)]);
    }

    #[test]
    fn rejects_bad_splits() {
        assert!(cascade_ranges(1.0, 100.0, &[50.0, 20.0]).is_err());
        assert!(cascade_ranges(1.0, 100.0, &[150.0]).is_err());
        assert!(cascade_ranges(1.0, 100.0, &[10.0, 20.0, 30.0, 40.0]).is_err());
        assert!(cascade_ranges(10.0, 1.0, &[]).is_err());
    }

    #[test]
    fn z_expansion_contains_the_original_range() {
        for (min_z, max_z) in [(-900.0, -100.0), (-900.0, 50.0), (20.0, 80.0), (-5.0, 0.0)] {
            let (lo, hi) = expand_z(min_z, max_z, 4.0);
            assert!(lo <= min_z, "{lo} > {min_z}");
            assert!(hi >= max_z, "{hi} < {max_z}");
        }
        assert_eq!(expand_z(-800.0, -200.0, 4.0), (-3200.0, -50.0));
        assert_eq!(expand_z(-800.0, 10.0, 4.0), (-3200.0, 40.0));
    }

    #[test]
    fn light_space_matrix_tightly_contains_the_slice() {
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 100.0, 300.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        let settings = CascadeSettings::default();
        let cascades =
            compute_cascades(view, Deg(70.0).into(), 16.0 / 9.0, 1.0, 1500.0, &settings).unwrap();
        assert_eq!(cascades.len(), 4);

        for cascade in &cascades {
            let slice = perspective(Deg(70.0).into(), 16.0 / 9.0, cascade.near, cascade.far);
            let corners = frustum_corners_world_space(slice * view).unwrap();
            let (mut min_x, mut max_x) = (f32::MAX, f32::MIN);
            let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);
            for corner in corners {
                let p = cascade.light_space * corner;
                let p = p / p.w;
                assert!(p.x >= -1.0 - 1e-3 && p.x <= 1.0 + 1e-3);
                assert!(p.y >= -1.0 - 1e-3 && p.y <= 1.0 + 1e-3);
                assert!(p.z >= -1e-4 && p.z <= 1.0 + 1e-4);
                min_x = min_x.min(p.x);
                max_x = max_x.max(p.x);
                min_y = min_y.min(p.y);
                max_y = max_y.max(p.y);
            }
            assert!((min_x + 1.0).abs() < 1e-3 && (max_x - 1.0).abs() < 1e-3);
            assert!((min_y + 1.0).abs() < 1e-3 && (max_y - 1.0).abs() < 1e-3);
        }
    }
}
