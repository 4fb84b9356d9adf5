//! GPU command vocabulary.
//!
//! The core never talks to a graphics API directly. Everything it needs (vertex arrays, immutable
//! buffers, shader stages and programs, uniform uploads and indexed draws) goes through the
//! [`Gpu`] trait. Handles are small `Copy` indices into tables owned by the backend; ownership of
//! the objects they name is expressed one level up, in
//! [`MeshHandles`](crate::data_structures::entity::MeshHandles) and
//! [`ShaderProgram`](crate::pipelines::program::ShaderProgram).
//!
//! Backends:
//! - [`recording::RecordingGpu`] records every command and tracks live handles; no device needed
//! - [`wgpu_backend::WgpuGpu`] maps the vocabulary onto a `wgpu` device and queue
//!
//! The whole interface is single-threaded. A backend is the "current context": it is created
//! once, used for init, every frame and teardown, and never shared between threads.

use std::fmt;

use crate::error::GpuError;

pub mod recording;
pub mod wgpu_backend;
pub mod wgsl;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Names a vertex attribute layout plus its bound element buffer.
    VertexArrayId
);
handle!(
    /// Names one buffer object (vertex or index data).
    BufferId
);
handle!(
    /// Names one compiled shader stage.
    StageId
);
handle!(
    /// Names one linked program.
    ProgramId
);

/// A uniform slot inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4([[f32; 4]; 4]),
    Vec4([f32; 4]),
    Float(f32),
}

impl UniformValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Mat4(m) => bytemuck::cast_slice(m),
            UniformValue::Vec4(v) => bytemuck::cast_slice(v),
            UniformValue::Float(f) => bytemuck::bytes_of(f),
        }
    }
}

impl From<cgmath::Matrix4<f32>> for UniformValue {
    fn from(m: cgmath::Matrix4<f32>) -> Self {
        UniformValue::Mat4(m.into())
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<f32> for UniformValue {
    fn from(f: f32) -> Self {
        UniformValue::Float(f)
    }
}

/// The commands the core issues against the current GPU context.
///
/// Matrices are column-major (`[[f32; 4]; 4]` is four columns), the same layout cgmath uses,
/// so nothing is ever transposed on upload.
pub trait Gpu {
    fn create_vertex_array(&mut self) -> Result<VertexArrayId, GpuError>;

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn create_buffer(&mut self) -> Result<BufferId, GpuError>;

    fn destroy_buffer(&mut self, buffer: BufferId);

    /// Uploads immutable data. The contents cannot change afterwards.
    fn upload_buffer(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<(), GpuError>;

    /// Declares a tightly packed `components x f32` stream at `location`, sourced from `buffer`.
    fn vertex_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        location: u32,
        buffer: BufferId,
        components: u32,
    );

    fn bind_index_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId);

    /// Compiles one stage. `Err` carries the raw driver diagnostic text.
    fn compile_stage(&mut self, source: &str, kind: StageKind) -> Result<StageId, String>;

    fn destroy_stage(&mut self, stage: StageId);

    /// Links two stages. The resulting program keeps no dependency on the stage objects.
    fn link_program(&mut self, vertex: StageId, fragment: StageId) -> Result<ProgramId, String>;

    fn destroy_program(&mut self, program: ProgramId);

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<Slot>;

    fn use_program(&mut self, program: ProgramId);

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);

    fn set_uniform(&mut self, slot: Slot, value: UniformValue);

    /// Draws `index_count` indices as a triangle list from the bound vertex array.
    fn draw_indexed_triangles(&mut self, index_count: u32);

    fn clear(&mut self, colour: [f32; 4]);

    /// Correction pre-multiplied onto a GL-convention projection (clip depth in [-1, 1]).
    fn clip_space_correction(&self) -> cgmath::Matrix4<f32> {
        <cgmath::Matrix4<f32> as cgmath::SquareMatrix>::identity()
    }
}

/// Lets a session borrow a backend instead of owning it.
impl<G: Gpu + ?Sized> Gpu for &mut G {
    fn create_vertex_array(&mut self) -> Result<VertexArrayId, GpuError> {
        (**self).create_vertex_array()
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayId) {
        (**self).destroy_vertex_array(vertex_array)
    }

    fn create_buffer(&mut self) -> Result<BufferId, GpuError> {
        (**self).create_buffer()
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        (**self).destroy_buffer(buffer)
    }

    fn upload_buffer(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<(), GpuError> {
        (**self).upload_buffer(buffer, target, data)
    }

    fn vertex_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        location: u32,
        buffer: BufferId,
        components: u32,
    ) {
        (**self).vertex_attribute(vertex_array, location, buffer, components)
    }

    fn bind_index_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) {
        (**self).bind_index_buffer(vertex_array, buffer)
    }

    fn compile_stage(&mut self, source: &str, kind: StageKind) -> Result<StageId, String> {
        (**self).compile_stage(source, kind)
    }

    fn destroy_stage(&mut self, stage: StageId) {
        (**self).destroy_stage(stage)
    }

    fn link_program(&mut self, vertex: StageId, fragment: StageId) -> Result<ProgramId, String> {
        (**self).link_program(vertex, fragment)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        (**self).destroy_program(program)
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        (**self).attribute_location(program, name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<Slot> {
        (**self).uniform_location(program, name)
    }

    fn use_program(&mut self, program: ProgramId) {
        (**self).use_program(program)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        (**self).bind_vertex_array(vertex_array)
    }

    fn set_uniform(&mut self, slot: Slot, value: UniformValue) {
        (**self).set_uniform(slot, value)
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        (**self).draw_indexed_triangles(index_count)
    }

    fn clear(&mut self, colour: [f32; 4]) {
        (**self).clear(colour)
    }

    fn clip_space_correction(&self) -> cgmath::Matrix4<f32> {
        (**self).clip_space_correction()
    }
}
