//! Camera and projection math.
//!
//! Conventions, fixed for the whole crate:
//! - cgmath matrices: column-major storage, column vectors, `parent * child` composition
//! - right-handed world and view space, the camera looks down its local -Z axis
//! - projections map view depth to GL clip depth in [-1, 1]; backends with another clip range
//!   pre-multiply [`Gpu::clip_space_correction`](crate::gpu::Gpu::clip_space_correction)
//! - [`look_at`] returns the camera (eye-to-world) transform, not the view matrix. Use
//!   [`Camera::view`] or invert it yourself.

use cgmath::{
    Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Quaternion, Rad, Rotation, Vector3, Zero,
};

/// wgpu uses clip depth in [0, 1], GL-style projections produce [-1, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// The axis an untransformed camera looks along.
pub const CANONICAL_FORWARD: Vector3<f32> = Vector3::new(0.0, 0.0, -1.0);

/// Vertical field of view that keeps the horizontal field of view at `fov` on portrait viewports.
///
/// Landscape and square viewports (`aspect >= 1`) return `fov` unchanged. Otherwise the half
/// width at the near plane is projected through the aspect ratio to get the half height, and the
/// vertical half angle is derived from that.
pub fn fov_adjusted_for_aspect(fov: Deg<f32>, aspect: f32, near_plane: f32) -> Deg<f32> {
    if aspect >= 1.0 {
        return fov;
    }
    let half_width = (Rad::from(fov).0 / 2.0).tan() * near_plane;
    let half_height = half_width / aspect;
    Deg::from(Rad((half_height / near_plane).atan() * 2.0))
}

/// Right-handed perspective projection. Requires `near_plane < far_plane`.
pub fn perspective_projection(
    vertical_fov: Deg<f32>,
    aspect: f32,
    near_plane: f32,
    far_plane: f32,
) -> Matrix4<f32> {
    debug_assert!(near_plane < far_plane, "near plane must be closer than far plane");
    let f = 1.0 / (Rad::from(vertical_fov).0 / 2.0).tan();
    let depth = near_plane - far_plane;

    #[rustfmt::skip]
    let matrix = Matrix4::new(
        f / aspect, 0.0, 0.0, 0.0,
        0.0, f, 0.0, 0.0,
        0.0, 0.0, (far_plane + near_plane) / depth, -1.0,
        0.0, 0.0, (2.0 * far_plane * near_plane) / depth, 0.0,
    );
    matrix
}

/// Right-handed orthographic projection of a `width` x `height` box centred on the view axis.
/// Requires positive extents and `near_plane != far_plane`.
pub fn orthographic_projection(
    width: f32,
    height: f32,
    near_plane: f32,
    far_plane: f32,
) -> Matrix4<f32> {
    debug_assert!(width > 0.0 && height > 0.0, "orthographic extents must be positive");
    debug_assert!(near_plane != far_plane, "near and far planes coincide");
    let depth = far_plane - near_plane;

    #[rustfmt::skip]
    let matrix = Matrix4::new(
        2.0 / width, 0.0, 0.0, 0.0,
        0.0, 2.0 / height, 0.0, 0.0,
        0.0, 0.0, -2.0 / depth, 0.0,
        0.0, 0.0, -(far_plane + near_plane) / depth, 1.0,
    );
    matrix
}

/// The camera transform of an eye looking at `target`. Requires `eye != target`.
///
/// The rotation is the shortest arc taking [`CANONICAL_FORWARD`] onto the viewing direction;
/// looking straight back turns about +Y.
pub fn look_at(eye: Point3<f32>, target: Point3<f32>) -> Matrix4<f32> {
    Matrix4::from_translation(eye.to_vec()) * Matrix4::from(look_rotation(eye, target))
}

fn look_rotation(eye: Point3<f32>, target: Point3<f32>) -> Quaternion<f32> {
    let offset = target - eye;
    debug_assert!(!offset.is_zero(), "eye and target coincide");
    Quaternion::from_arc(CANONICAL_FORWARD, offset.normalize(), Some(Vector3::unit_y()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<E: Into<Point3<f32>>, T: Into<Point3<f32>>>(eye: E, target: T) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
        }
    }

    /// Eye-to-world.
    pub fn transform(&self) -> Matrix4<f32> {
        look_at(self.eye, self.target)
    }

    /// World-to-eye, the rigid inverse of [`Camera::transform`].
    pub fn view(&self) -> Matrix4<f32> {
        let inverse = look_rotation(self.eye, self.target).invert();
        Matrix4::from(inverse) * Matrix4::from_translation(-self.eye.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fov: Deg<f32>,
    near_plane: f32,
    far_plane: f32,
}

impl Projection {
    pub fn new<F: Into<Deg<f32>>>(
        width: u32,
        height: u32,
        fov: F,
        near_plane: f32,
        far_plane: f32,
    ) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fov: fov.into(),
            near_plane,
            far_plane,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// The vertical field of view actually used, after the portrait adjustment.
    pub fn fovy(&self) -> Deg<f32> {
        fov_adjusted_for_aspect(self.fov, self.aspect, self.near_plane)
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        perspective_projection(self.fovy(), self.aspect, self.near_plane, self.far_plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{SquareMatrix, Vector4, perspective};

    fn assert_close(actual: Matrix4<f32>, expected: Matrix4<f32>) {
        let a: &[f32; 16] = actual.as_ref();
        let e: &[f32; 16] = expected.as_ref();
        for (x, y) in a.iter().zip(e) {
            assert!((x - y).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn perspective_matches_cgmath() {
        let ours = perspective_projection(Deg(60.0), 4.0 / 3.0, 0.1, 1000.0);
        let reference = perspective(Deg(60.0), 4.0 / 3.0, 0.1, 1000.0);
        assert_close(ours, reference);
    }

    #[test]
    fn perspective_maps_planes_to_clip_range() {
        let m = perspective_projection(Deg(60.0), 1.0, 0.5, 50.0);
        let near = m * Vector4::new(0.0, 0.0, -0.5, 1.0);
        let far = m * Vector4::new(0.0, 0.0, -50.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn orthographic_matches_cgmath() {
        let ours = orthographic_projection(8.0, 6.0, 0.1, 100.0);
        let reference = cgmath::ortho(-4.0, 4.0, -3.0, 3.0, 0.1, 100.0);
        assert_close(ours, reference);
    }

    #[test]
    fn view_inverts_transform() {
        let camera = Camera::new((3.0, 4.0, 5.0), (0.0, 1.0, 0.0));
        assert_close(camera.view() * camera.transform(), Matrix4::identity());
    }
}
