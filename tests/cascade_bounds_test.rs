use cgmath::{Deg, Matrix4, Point3, Vector3, Vector4};
use render_dojo::{
    camera::{frustum_corners_world_space, perspective},
    shadow::{
        cascade::{CascadeSettings, MAX_CASCADES, compute_cascades},
        point::cube_view_projs,
    },
};

const EPS: f32 = 1e-3;

fn orbit_view(yaw: f32, pitch: f32, distance: f32) -> Matrix4<f32> {
    let eye = Point3::new(
        distance * pitch.cos() * yaw.sin(),
        distance * pitch.sin(),
        distance * pitch.cos() * yaw.cos(),
    );
    Matrix4::look_at_rh(eye, Point3::new(0.0, 0.0, 0.0), Vector3::unit_y())
}

fn to_clip(m: Matrix4<f32>, p: Vector4<f32>) -> Vector4<f32> {
    let c = m * p;
    c / c.w
}

#[test]
fn cascades_cover_the_camera_range_without_gaps() {
    let settings = CascadeSettings::default();
    let cascades = compute_cascades(
        orbit_view(0.8, 0.6, 300.0),
        Deg(70.0).into(),
        16.0 / 9.0,
        1.0,
        1500.0,
        &settings,
    )
    .unwrap();

    assert_eq!(cascades.len(), settings.split_distances.len() + 1);
    assert!(cascades.len() <= MAX_CASCADES);
    assert_eq!(cascades[0].near, 1.0);
    assert_eq!(cascades[cascades.len() - 1].far, 1500.0);
    for pair in cascades.windows(2) {
        assert_eq!(pair[0].far, pair[1].near);
    }
}

#[test]
fn every_slice_lands_inside_its_shadow_map() {
    let settings = CascadeSettings::default();
    let fov = Deg(70.0).into();
    for (yaw, pitch) in [(0.0, 0.3), (0.8, 0.6), (2.5, 1.2), (-1.9, 0.05)] {
        let view = orbit_view(yaw, pitch, 300.0);
        let cascades = compute_cascades(view, fov, 1.5, 1.0, 1500.0, &settings).unwrap();
        for cascade in &cascades {
            let slice = perspective(fov, 1.5, cascade.near, cascade.far);
            let corners = frustum_corners_world_space(slice * view).unwrap();
            for corner in corners {
                let p = to_clip(cascade.light_space, corner);
                assert!(p.x.abs() <= 1.0 + EPS, "x {} outside", p.x);
                assert!(p.y.abs() <= 1.0 + EPS, "y {} outside", p.y);
                assert!(p.z >= -EPS && p.z <= 1.0 + EPS, "z {} outside", p.z);
            }
        }
    }
}

#[test]
fn a_single_cascade_without_splits() {
    let settings = CascadeSettings {
        split_distances: Vec::new(),
        ..CascadeSettings::default()
    };
    let cascades = compute_cascades(
        orbit_view(0.0, 0.4, 50.0),
        Deg(60.0).into(),
        1.0,
        0.5,
        100.0,
        &settings,
    )
    .unwrap();
    assert_eq!(cascades.len(), 1);
    assert_eq!((cascades[0].near, cascades[0].far), (0.5, 100.0));
}

#[test]
fn too_many_splits_are_rejected() {
    let settings = CascadeSettings {
        split_distances: vec![10.0, 20.0, 30.0, 40.0],
        ..CascadeSettings::default()
    };
    let result = compute_cascades(
        orbit_view(0.0, 0.4, 50.0),
        Deg(60.0).into(),
        1.0,
        1.0,
        100.0,
        &settings,
    );
    assert!(result.is_err());
}

#[test]
fn cube_faces_see_every_direction_around_the_light() {
    let light = Point3::new(0.1, 0.2, -0.3);
    let faces = cube_view_projs(light, 0.01, 2.0);
    let directions = [
        Vector3::new(0.5, 0.1, 0.2),
        Vector3::new(-0.4, 0.3, -0.1),
        Vector3::new(0.05, 0.9, -0.2),
        Vector3::new(0.2, -0.7, 0.3),
        Vector3::new(-0.1, 0.1, 0.6),
        Vector3::new(0.3, -0.2, -0.8),
    ];
    for d in directions {
        let p = (light + d).to_homogeneous();
        let seen = faces.iter().any(|m| {
            let c = *m * p;
            if c.w <= 0.0 {
                return false;
            }
            let c = c / c.w;
            c.x.abs() <= 1.0 && c.y.abs() <= 1.0 && (0.0..=1.0).contains(&c.z)
        });
        assert!(seen, "direction {d:?} is on no face");
    }
}
