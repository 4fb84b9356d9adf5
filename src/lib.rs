//! forward-ngin
//!
//! A minimal forward renderer. An imported node/mesh hierarchy is flattened into render
//! entities that own their GPU objects, and every frame each entity is drawn once with a single
//! linked program. Windowing, the event loop and file IO for shaders stay with the caller.
//!
//! High-level modules
//! - `camera`: projection and look-at math, plus the camera and projection state of a session
//! - `config`: session defaults (field of view, clip planes, clear colour, material fallbacks)
//! - `context`: the render session that ties program, scene graph and camera together
//! - `data_structures`: imported scene model, render entities and the scene graph builder
//! - `error`: the error taxonomy
//! - `gpu`: the GPU command vocabulary, a recording backend and a wgpu backend
//! - `pipelines`: shader program linking and the bundled WGSL program
//! - `resources`: glTF and OBJ loaders producing the imported scene model
//! - `render`: the per-frame draw dispatch
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod gpu;
pub mod pipelines;
pub mod render;
pub mod resources;

pub use cgmath;
pub use config::{MaterialDefaults, RenderConfig};
pub use context::Context;
pub use error::{Error, Result};
pub use gpu::{Gpu, recording::RecordingGpu, wgpu_backend::WgpuGpu};
pub use pipelines::program::ShaderSources;
pub use wgpu;

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`. Calling it again is a no-op.
pub fn init_logging() {
    if let Err(e) = env_logger::try_init() {
        log::debug!("logger already initialised: {e}");
    }
}
