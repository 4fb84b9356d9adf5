//! Shader program linking.
//!
//! A program is compiled and linked once at startup and never changes afterwards. Any compile or
//! link failure is fatal: the driver's diagnostic text goes to the log verbatim and comes back in
//! the [`ShaderError`], and nothing is rendered without a linked program.

use crate::{
    error::ShaderError,
    gpu::{Gpu, ProgramId, Slot, StageId, StageKind},
    pipelines::forward,
};

/// The two stage sources of a program, as handed over by whoever loaded them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl Default for ShaderSources {
    fn default() -> Self {
        forward::sources()
    }
}

/// Compiles one stage.
pub fn compile_stage<G: Gpu>(
    gpu: &mut G,
    source: &str,
    stage: StageKind,
) -> Result<StageId, ShaderError> {
    gpu.compile_stage(source, stage).map_err(|log| {
        let log = non_empty(log, "compile error");
        log::error!("{log}");
        ShaderError::Compile { stage, log }
    })
}

/// Links two compiled stages. The stage objects are released whether or not linking succeeds.
pub fn link_program<G: Gpu>(
    gpu: &mut G,
    vertex: StageId,
    fragment: StageId,
) -> Result<ProgramId, ShaderError> {
    let linked = gpu.link_program(vertex, fragment);
    gpu.destroy_stage(vertex);
    gpu.destroy_stage(fragment);
    linked.map_err(|log| {
        let log = non_empty(log, "link error");
        log::error!("{log}");
        ShaderError::Link { log }
    })
}

/// Resolves a uniform by name. `None` means the compiler stripped or never saw it.
pub fn resolve_uniform<G: Gpu>(gpu: &G, program: ProgramId, name: &str) -> Option<Slot> {
    let slot = gpu.uniform_location(program, name);
    if slot.is_none() {
        log::debug!("uniform `{name}` is not active in program {}", program.index());
    }
    slot
}

pub fn resolve_attribute<G: Gpu>(gpu: &G, program: ProgramId, name: &str) -> Option<u32> {
    let location = gpu.attribute_location(program, name);
    if location.is_none() {
        log::debug!("attribute `{name}` is not active in program {}", program.index());
    }
    location
}

fn non_empty(log: String, fallback: &str) -> String {
    if log.trim().is_empty() {
        fallback.to_string()
    } else {
        log
    }
}

/// The name to slot mapping of a linked program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramSlots {
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub lwp_matrix: Option<Slot>,
    pub diffuse: Option<Slot>,
    pub ambient: Option<Slot>,
    pub specular: Option<Slot>,
    pub emission: Option<Slot>,
    pub shininess: Option<Slot>,
}

impl ProgramSlots {
    pub fn resolve<G: Gpu>(gpu: &G, program: ProgramId) -> Self {
        Self {
            position: resolve_attribute(gpu, program, forward::ATTR_POSITION),
            normal: resolve_attribute(gpu, program, forward::ATTR_NORMAL),
            lwp_matrix: resolve_uniform(gpu, program, forward::LWP_MATRIX),
            diffuse: resolve_uniform(gpu, program, forward::DIFFUSE_MATERIAL),
            ambient: resolve_uniform(gpu, program, forward::AMBIENT_MATERIAL),
            specular: resolve_uniform(gpu, program, forward::SPECULAR_MATERIAL),
            emission: resolve_uniform(gpu, program, forward::EMISSION_MATERIAL),
            shininess: resolve_uniform(gpu, program, forward::SHININESS_MATERIAL),
        }
    }
}

/// A linked program and its slots. Move-only; give it back with [`ShaderProgram::release`].
#[derive(Debug)]
pub struct ShaderProgram {
    handle: ProgramId,
    slots: ProgramSlots,
}

impl ShaderProgram {
    /// Compiles both stages and links them. A vertex stage that fails to compile stops here:
    /// the fragment stage is never compiled and nothing is linked.
    pub fn link<G: Gpu>(gpu: &mut G, sources: &ShaderSources) -> Result<Self, ShaderError> {
        let vertex = compile_stage(gpu, &sources.vertex, StageKind::Vertex)?;
        let fragment = match compile_stage(gpu, &sources.fragment, StageKind::Fragment) {
            Ok(fragment) => fragment,
            Err(e) => {
                gpu.destroy_stage(vertex);
                return Err(e);
            }
        };
        let handle = link_program(gpu, vertex, fragment)?;
        let slots = ProgramSlots::resolve(gpu, handle);
        log::info!("linked program {} with {:?}", handle.index(), slots);
        Ok(Self { handle, slots })
    }

    pub fn handle(&self) -> ProgramId {
        self.handle
    }

    pub fn slots(&self) -> &ProgramSlots {
        &self.slots
    }

    pub fn release<G: Gpu>(self, gpu: &mut G) {
        gpu.destroy_program(self.handle);
        std::mem::forget(self);
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        log::warn!("program {} dropped without being released", self.handle.index());
    }
}
