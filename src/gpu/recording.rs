//! Headless backend that records commands instead of executing them.
//!
//! `RecordingGpu` hands out handles from counters, keeps every issued command in order and
//! tracks which handles are alive. Misuse (destroying twice, touching a destroyed handle,
//! drawing without a program or with too short an index buffer) does not panic; it is noted in
//! [`RecordingGpu::violations`] so a caller can assert there were none.
//!
//! Shader stages go through the same WGSL front end as the wgpu backend, so bad sources produce
//! real diagnostics and slots resolve to the same values.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::GpuError;

use super::{
    BufferId, BufferTarget, Gpu, ProgramId, Slot, StageId, StageKind, UniformValue, VertexArrayId,
    wgsl::{self, CompiledStage, ProgramLayout},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateVertexArray(VertexArrayId),
    DestroyVertexArray(VertexArrayId),
    CreateBuffer(BufferId),
    DestroyBuffer(BufferId),
    UploadBuffer {
        buffer: BufferId,
        target: BufferTarget,
        len: usize,
    },
    VertexAttribute {
        vertex_array: VertexArrayId,
        location: u32,
        buffer: BufferId,
        components: u32,
    },
    BindIndexBuffer {
        vertex_array: VertexArrayId,
        buffer: BufferId,
    },
    CompileStage {
        kind: StageKind,
        result: Option<StageId>,
    },
    DestroyStage(StageId),
    LinkProgram {
        vertex: StageId,
        fragment: StageId,
        result: Option<ProgramId>,
    },
    DestroyProgram(ProgramId),
    UseProgram(ProgramId),
    BindVertexArray(Option<VertexArrayId>),
    SetUniform {
        slot: Slot,
        value: UniformValue,
    },
    DrawIndexedTriangles {
        index_count: u32,
    },
    Clear([f32; 4]),
}

#[derive(Debug, Default)]
struct VertexArrayState {
    attributes: BTreeMap<u32, BufferId>,
    index_buffer: Option<BufferId>,
}

#[derive(Debug, Default)]
pub struct RecordingGpu {
    commands: Vec<Command>,
    violations: Vec<String>,
    next_id: u32,
    allocations: usize,
    allocation_budget: Option<usize>,
    vertex_arrays: BTreeMap<VertexArrayId, VertexArrayState>,
    buffers: BTreeMap<BufferId, Option<(BufferTarget, Vec<u8>)>>,
    stages: BTreeMap<StageId, CompiledStage>,
    programs: BTreeMap<ProgramId, ProgramLayout>,
    destroyed: BTreeSet<(&'static str, u32)>,
    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `budget` more allocations (vertex arrays, buffers, uploads) succeed; every
    /// allocation after that fails.
    pub fn with_allocation_budget(mut self, budget: usize) -> Self {
        self.allocation_budget = Some(self.allocations + budget);
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// The bytes uploaded into `buffer`, if it is alive and has been uploaded to.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers
            .get(&buffer)
            .and_then(|data| data.as_ref())
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Index data of `buffer` read back as `u32`s.
    pub fn index_contents(&self, buffer: BufferId) -> Option<Vec<u32>> {
        self.buffer_contents(buffer).map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    pub fn draw_calls(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::DrawIndexedTriangles { index_count } => Some(*index_count),
                _ => None,
            })
            .collect()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn allocate(&mut self, what: &'static str) -> Result<(), GpuError> {
        if self
            .allocation_budget
            .is_some_and(|budget| self.allocations >= budget)
        {
            return Err(GpuError::AllocationFailed {
                what,
                reason: "allocation budget exhausted".to_string(),
            });
        }
        self.allocations += 1;
        Ok(())
    }

    fn violation(&mut self, what: &'static str, id: u32, action: &str) {
        let reason = if self.destroyed.contains(&(what, id)) {
            "after it was destroyed"
        } else {
            "but it was never created"
        };
        let message = format!("{action} {what} {id} {reason}");
        log::warn!("{message}");
        self.violations.push(message);
    }
}

impl Gpu for RecordingGpu {
    fn create_vertex_array(&mut self) -> Result<VertexArrayId, GpuError> {
        self.allocate("vertex array")?;
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id, VertexArrayState::default());
        self.commands.push(Command::CreateVertexArray(id));
        Ok(id)
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.commands.push(Command::DestroyVertexArray(vertex_array));
        if self.vertex_arrays.remove(&vertex_array).is_some() {
            self.destroyed.insert(("vertex array", vertex_array.0));
        } else {
            self.violation("vertex array", vertex_array.0, "destroyed");
        }
    }

    fn create_buffer(&mut self) -> Result<BufferId, GpuError> {
        self.allocate("buffer")?;
        let id = BufferId(self.next());
        self.buffers.insert(id, None);
        self.commands.push(Command::CreateBuffer(id));
        Ok(id)
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.commands.push(Command::DestroyBuffer(buffer));
        if self.buffers.remove(&buffer).is_some() {
            self.destroyed.insert(("buffer", buffer.0));
        } else {
            self.violation("buffer", buffer.0, "destroyed");
        }
    }

    fn upload_buffer(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<(), GpuError> {
        if !self.buffers.contains_key(&buffer) {
            self.violation("buffer", buffer.0, "uploaded to");
            return Err(GpuError::UnknownHandle {
                what: "buffer",
                id: buffer.0,
            });
        }
        self.allocate("buffer storage")?;
        self.commands.push(Command::UploadBuffer {
            buffer,
            target,
            len: data.len(),
        });
        self.buffers.insert(buffer, Some((target, data.to_vec())));
        Ok(())
    }

    fn vertex_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        location: u32,
        buffer: BufferId,
        components: u32,
    ) {
        self.commands.push(Command::VertexAttribute {
            vertex_array,
            location,
            buffer,
            components,
        });
        if !self.buffers.contains_key(&buffer) {
            self.violation("buffer", buffer.0, "attached");
        }
        match self.vertex_arrays.get_mut(&vertex_array) {
            Some(state) => {
                state.attributes.insert(location, buffer);
            }
            None => self.violation("vertex array", vertex_array.0, "configured"),
        }
    }

    fn bind_index_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) {
        self.commands.push(Command::BindIndexBuffer {
            vertex_array,
            buffer,
        });
        if !self.buffers.contains_key(&buffer) {
            self.violation("buffer", buffer.0, "attached");
        }
        match self.vertex_arrays.get_mut(&vertex_array) {
            Some(state) => state.index_buffer = Some(buffer),
            None => self.violation("vertex array", vertex_array.0, "configured"),
        }
    }

    fn compile_stage(&mut self, source: &str, kind: StageKind) -> Result<StageId, String> {
        match wgsl::compile(source, kind) {
            Ok(compiled) => {
                let id = StageId(self.next());
                self.stages.insert(id, compiled);
                self.commands.push(Command::CompileStage {
                    kind,
                    result: Some(id),
                });
                Ok(id)
            }
            Err(log) => {
                self.commands.push(Command::CompileStage { kind, result: None });
                Err(log)
            }
        }
    }

    fn destroy_stage(&mut self, stage: StageId) {
        self.commands.push(Command::DestroyStage(stage));
        if self.stages.remove(&stage).is_some() {
            self.destroyed.insert(("stage", stage.0));
        } else {
            self.violation("stage", stage.0, "destroyed");
        }
    }

    fn link_program(&mut self, vertex: StageId, fragment: StageId) -> Result<ProgramId, String> {
        let linked = match (self.stages.get(&vertex), self.stages.get(&fragment)) {
            (Some(vs), Some(fs)) => wgsl::link(vs, fs),
            _ => Err(format!(
                "error: stage {} or {} is not a compiled stage",
                vertex.0, fragment.0
            )),
        };
        match linked {
            Ok(layout) => {
                let id = ProgramId(self.next());
                self.programs.insert(id, layout);
                self.commands.push(Command::LinkProgram {
                    vertex,
                    fragment,
                    result: Some(id),
                });
                Ok(id)
            }
            Err(log) => {
                self.commands.push(Command::LinkProgram {
                    vertex,
                    fragment,
                    result: None,
                });
                Err(log)
            }
        }
    }

    fn destroy_program(&mut self, program: ProgramId) {
        self.commands.push(Command::DestroyProgram(program));
        if self.programs.remove(&program).is_some() {
            self.destroyed.insert(("program", program.0));
            if self.current_program == Some(program) {
                self.current_program = None;
            }
        } else {
            self.violation("program", program.0, "destroyed");
        }
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.attribute_location(name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<Slot> {
        self.programs
            .get(&program)?
            .uniform(name)
            .map(|member| Slot(member.offset))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.commands.push(Command::UseProgram(program));
        if self.programs.contains_key(&program) {
            self.current_program = Some(program);
        } else {
            self.violation("program", program.0, "used");
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.commands.push(Command::BindVertexArray(vertex_array));
        if let Some(id) = vertex_array {
            if !self.vertex_arrays.contains_key(&id) {
                self.violation("vertex array", id.0, "bound");
            }
        }
        self.bound_vertex_array = vertex_array;
    }

    fn set_uniform(&mut self, slot: Slot, value: UniformValue) {
        self.commands.push(Command::SetUniform { slot, value });
        if self.current_program.is_none() {
            self.violations
                .push(format!("uniform slot {} set with no program in use", slot.0));
        }
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        self.commands
            .push(Command::DrawIndexedTriangles { index_count });
        if self.current_program.is_none() {
            self.violations.push("draw with no program in use".to_string());
        }
        let Some(vertex_array) = self.bound_vertex_array else {
            self.violations.push("draw with no vertex array bound".to_string());
            return;
        };
        let available = self
            .vertex_arrays
            .get(&vertex_array)
            .and_then(|state| state.index_buffer)
            .and_then(|buffer| self.buffer_contents(buffer))
            .map_or(0, |bytes| bytes.len() / 4);
        if (index_count as usize) > available {
            self.violations.push(format!(
                "draw of {index_count} indices from vertex array {} holding {available}",
                vertex_array.0
            ));
        }
    }

    fn clear(&mut self, colour: [f32; 4]) {
        self.commands.push(Command::Clear(colour));
    }
}
