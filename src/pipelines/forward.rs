//! The bundled single-pass forward program.
//!
//! Both stages declare the same `Material` block at `@group(0) @binding(0)`. The slot names here
//! are the ones [`ProgramSlots::resolve`](super::program::ProgramSlots::resolve) looks up.

use super::program::ShaderSources;

pub const ATTR_POSITION: &str = "attr_pos";
pub const ATTR_NORMAL: &str = "attr_normal";

pub const LWP_MATRIX: &str = "lwp_matrix";
pub const DIFFUSE_MATERIAL: &str = "diffuse_material";
pub const AMBIENT_MATERIAL: &str = "ambient_material";
pub const SPECULAR_MATERIAL: &str = "specular_material";
pub const EMISSION_MATERIAL: &str = "emission_material";
pub const SHININESS_MATERIAL: &str = "shininess_material";

pub fn sources() -> ShaderSources {
    ShaderSources {
        vertex: include_str!("forward.vert.wgsl").to_string(),
        fragment: include_str!("forward.frag.wgsl").to_string(),
    }
}
