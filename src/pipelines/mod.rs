//! Shader programs.
//!
//! - `program` compiles, links and resolves slots of a program through the
//!   [`Gpu`](crate::gpu::Gpu) trait
//! - `forward` is the bundled WGSL program the renderer is written against

pub mod forward;
pub mod program;
