mod common;

use common::test_utils::*;
use forward_ngin::{
    camera::{
        CANONICAL_FORWARD, Camera, Projection, fov_adjusted_for_aspect, look_at,
        orthographic_projection, perspective_projection,
    },
    cgmath::{Deg, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4},
};

fn rotate(m: Matrix4<f32>, v: Vector3<f32>) -> Vector3<f32> {
    (m * v.extend(0.0)).truncate()
}

#[test]
fn square_viewport_keeps_fov() {
    for near in [0.01, 0.1, 1.0, 25.0] {
        assert_eq!(fov_adjusted_for_aspect(Deg(60.0), 1.0, near), Deg(60.0));
    }
    assert_eq!(fov_adjusted_for_aspect(Deg(60.0), 16.0 / 9.0, 0.1), Deg(60.0));
}

#[test]
fn portrait_viewport_widens_vertical_fov() {
    for aspect in [0.99, 0.75, 0.5, 0.1] {
        let fovy = fov_adjusted_for_aspect(Deg(60.0), aspect, 0.1);
        assert!(fovy.0 >= 60.0, "aspect {aspect}: {fovy:?}");
        assert!(fovy.0 < 180.0);
    }
}

#[test]
fn portrait_viewport_keeps_horizontal_extent() {
    let aspect = 0.5;
    let fovy = fov_adjusted_for_aspect(Deg(60.0), aspect, 0.1);
    let projection = perspective_projection(fovy, aspect, 0.1, 100.0);
    // x scale of the projection is cot(fov_x / 2), which should match cot(30 degrees)
    let expected = 1.0 / (30.0f32).to_radians().tan();
    assert!((projection.x.x - expected).abs() < 1e-4, "{}", projection.x.x);
}

#[test]
fn look_at_down_negative_z() {
    let transform = look_at(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 0.0));

    assert_eq!(transform.w, Vector4::new(0.0, 0.0, 10.0, 1.0));
    let forward = rotate(transform, CANONICAL_FORWARD);
    assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-6);
}

#[test]
fn look_at_from_the_side() {
    let transform = look_at(Point3::new(10.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0));

    let forward = rotate(transform, CANONICAL_FORWARD);
    assert!((forward - Vector3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-6);
    assert_eq!(transform.w.truncate(), Vector3::new(10.0, 0.0, 0.0));
}

#[test]
fn look_at_straight_back() {
    let transform = look_at(Point3::new(0.0, 0.0, -5.0), Point3::new(0.0, 0.0, 0.0));
    let forward = rotate(transform, CANONICAL_FORWARD);
    assert!((forward - Vector3::unit_z()).magnitude() < 1e-6);
}

#[test]
fn view_puts_target_on_negative_z_axis() {
    let camera = Camera::new((4.0, 3.0, 0.0), (0.0, 0.0, 0.0));
    let target = camera.view() * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert!(target.x.abs() < 1e-5);
    assert!(target.y.abs() < 1e-5);
    assert!((target.z + 5.0).abs() < 1e-5);
}

#[test]
fn view_is_inverse_of_camera_transform() {
    let camera = Camera::new((1.0, -2.0, 7.0), (0.5, 0.5, 0.5));
    let inverse = camera.transform().invert().expect("rigid transform");
    assert_close(camera.view(), inverse);
}

#[test]
fn perspective_projects_into_clip_volume() {
    let m = perspective_projection(Deg(90.0), 1.0, 1.0, 10.0);
    let corner = m * Vector4::new(1.0, 1.0, -1.0, 1.0);
    assert!((corner.x / corner.w - 1.0).abs() < 1e-5);
    assert!((corner.y / corner.w - 1.0).abs() < 1e-5);
    assert!((corner.z / corner.w + 1.0).abs() < 1e-5);
}

#[test]
fn orthographic_maps_box_to_unit_cube() {
    let m = orthographic_projection(4.0, 2.0, 1.0, 11.0);
    let near_corner = m * Vector4::new(2.0, 1.0, -1.0, 1.0);
    let far_corner = m * Vector4::new(-2.0, -1.0, -11.0, 1.0);
    assert!((near_corner - Vector4::new(1.0, 1.0, -1.0, 1.0)).magnitude() < 1e-5);
    assert!((far_corner - Vector4::new(-1.0, -1.0, 1.0, 1.0)).magnitude() < 1e-5);
}

#[test]
fn projection_tracks_viewport() {
    let mut projection = Projection::new(800, 600, Deg(60.0), 0.1, 1000.0);
    assert!((projection.aspect() - 4.0 / 3.0).abs() < 1e-6);
    assert_eq!(projection.fovy(), Deg(60.0));

    projection.resize(600, 1200);
    assert_eq!(projection.aspect(), 0.5);
    assert!(projection.fovy().0 > 60.0);
}
