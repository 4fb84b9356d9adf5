//! Session configuration.
//!
//! Plain structs with `Default` impls. Nothing is read from disk; callers override the fields
//! they care about and [`RenderConfig::validate`] checks the result before any GPU work.

use cgmath::{Deg, Point3};

use crate::error::ConfigError;

/// What a material gets for the channels the importer left empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDefaults {
    pub diffuse: [f32; 4],
    pub ambient: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    pub shininess: f32,
}

impl Default for MaterialDefaults {
    fn default() -> Self {
        Self {
            diffuse: [0.0; 4],
            ambient: [0.0; 4],
            specular: [0.0; 4],
            emissive: [0.0; 4],
            shininess: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Vertical field of view on landscape viewports.
    pub fov: Deg<f32>,
    pub near_plane: f32,
    pub far_plane: f32,
    pub clear_colour: [f32; 4],
    pub camera_eye: Point3<f32>,
    pub camera_target: Point3<f32>,
    pub material_defaults: MaterialDefaults,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov: Deg(60.0),
            near_plane: 0.1,
            far_plane: 1000.0,
            clear_colour: [0.0, 0.0, 1.0, 1.0],
            camera_eye: Point3::new(0.0, 0.0, 10.0),
            camera_target: Point3::new(0.0, 0.0, 0.0),
            material_defaults: MaterialDefaults::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.near_plane > 0.0 && self.near_plane < self.far_plane) {
            return Err(ConfigError::DepthRange {
                near: self.near_plane,
                far: self.far_plane,
            });
        }
        if !(self.fov.0 > 0.0 && self.fov.0 < 180.0) {
            return Err(ConfigError::FieldOfView(self.fov.0));
        }
        if self.camera_eye == self.camera_target {
            return Err(ConfigError::DegenerateCamera(self.camera_eye.into()));
        }
        Ok(())
    }
}
