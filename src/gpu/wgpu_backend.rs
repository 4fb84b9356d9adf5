//! wgpu backend.
//!
//! The GL-shaped vocabulary maps onto wgpu like this:
//! - a buffer becomes an immutable `wgpu::Buffer` at upload time; zero-length uploads allocate
//!   nothing and draw nothing
//! - a vertex array is a CPU-side record of location -> buffer plus the element buffer
//! - a stage is a validated naga module; linking builds the render pipeline, with one vertex
//!   buffer per `@location` input of the vertex entry point
//! - uniform slots are byte offsets into the block at `@group(0) @binding(0)`; `set_uniform`
//!   writes into the program's staging copy and every draw snapshots that copy
//!
//! Draws are recorded and executed by [`WgpuGpu::submit`], which encodes one render pass into
//! the caller's [`FrameTarget`]. `clear` opens a new frame, so draws recorded without a
//! submit in between are dropped rather than piling up. A pending draw keeps its own reference
//! to the buffers it reads, so releasing an entity before the submit is safe.

use std::{collections::BTreeMap, num::NonZeroU64};

use wgpu::util::DeviceExt;

use crate::{camera::OPENGL_TO_WGPU_MATRIX, error::GpuError};

use super::{
    BufferId, BufferTarget, Gpu, ProgramId, Slot, StageId, StageKind, UniformValue, VertexArrayId,
    wgsl::{self, CompiledStage, ProgramLayout},
};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Where [`WgpuGpu::submit`] renders to.
pub struct FrameTarget<'a> {
    pub colour: &'a wgpu::TextureView,
    pub depth: Option<&'a wgpu::TextureView>,
}

#[derive(Debug, Default)]
struct VertexArray {
    attributes: BTreeMap<u32, BufferId>,
    index_buffer: Option<BufferId>,
}

#[derive(Debug)]
struct Program {
    layout: ProgramLayout,
    pipeline: wgpu::RenderPipeline,
    staging: Vec<u8>,
}

struct DrawCall {
    pipeline: wgpu::RenderPipeline,
    vertex_buffers: Vec<wgpu::Buffer>,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniforms: Option<(u64, u64)>,
}

#[derive(Default)]
struct Frame {
    clear: Option<wgpu::Color>,
    uniforms: Vec<u8>,
    draws: Vec<DrawCall>,
}

pub struct WgpuGpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    colour_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    next_id: u32,
    vertex_arrays: BTreeMap<VertexArrayId, VertexArray>,
    buffers: BTreeMap<BufferId, Option<wgpu::Buffer>>,
    stages: BTreeMap<StageId, CompiledStage>,
    programs: BTreeMap<ProgramId, Program>,
    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
    frame: Frame,
}

impl WgpuGpu {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        colour_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            device,
            queue,
            colour_format,
            depth_format,
            next_id: 0,
            vertex_arrays: BTreeMap::new(),
            buffers: BTreeMap::new(),
            stages: BTreeMap::new(),
            programs: BTreeMap::new(),
            current_program: None,
            bound_vertex_array: None,
            frame: Frame::default(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn create_depth_texture(&self, width: u32, height: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.depth_format.unwrap_or(DEPTH_FORMAT),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    /// Draws recorded since the last submit.
    pub fn pending_draws(&self) -> usize {
        self.frame.draws.len()
    }

    /// Byte offsets of the pending draws' uniform slices in the frame's uniform buffer.
    pub fn pending_uniform_offsets(&self) -> Vec<u64> {
        self.frame
            .draws
            .iter()
            .filter_map(|draw| draw.uniforms.map(|(offset, _)| offset))
            .collect()
    }

    /// Buffers that hold uploaded data. Created but never filled buffers do not count.
    pub fn allocated_buffers(&self) -> usize {
        self.buffers.values().filter(|b| b.is_some()).count()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Executes everything recorded since the last submit into `target`.
    pub fn submit(&mut self, target: &FrameTarget<'_>) {
        let frame = std::mem::take(&mut self.frame);

        let uniform_buffer = (!frame.uniforms.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Frame Uniform Buffer"),
                    contents: &frame.uniforms,
                    usage: wgpu::BufferUsages::UNIFORM,
                })
        });

        let bind_groups: Vec<Option<wgpu::BindGroup>> = frame
            .draws
            .iter()
            .map(|draw| {
                let (offset, size) = draw.uniforms?;
                let buffer = uniform_buffer.as_ref()?;
                Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Material Bind Group"),
                    layout: &draw.pipeline.get_bind_group_layout(wgsl::UNIFORM_GROUP),
                    entries: &[wgpu::BindGroupEntry {
                        binding: wgsl::UNIFORM_BINDING,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset,
                            size: NonZeroU64::new(size),
                        }),
                    }],
                }))
            })
            .collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let load = frame.clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.colour,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: target.depth.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (draw, bind_group) in frame.draws.iter().zip(&bind_groups) {
                render_pass.set_pipeline(&draw.pipeline);
                if let Some(bind_group) = bind_group {
                    render_pass.set_bind_group(wgsl::UNIFORM_GROUP, bind_group, &[]);
                }
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                render_pass
                    .set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        log::debug!("submitted frame with {} draws", frame.draws.len());
    }

    fn build_pipeline(
        &self,
        vertex: &CompiledStage,
        fragment: &CompiledStage,
        layout: &ProgramLayout,
    ) -> Result<wgpu::RenderPipeline, String> {
        let attributes = layout
            .inputs
            .iter()
            .map(|input| {
                let format = match input.components {
                    1 => wgpu::VertexFormat::Float32,
                    2 => wgpu::VertexFormat::Float32x2,
                    3 => wgpu::VertexFormat::Float32x3,
                    4 => wgpu::VertexFormat::Float32x4,
                    n => {
                        return Err(format!(
                            "error: vertex input `{}` has unsupported width {n}",
                            input.name
                        ));
                    }
                };
                Ok([wgpu::VertexAttribute {
                    format,
                    offset: 0,
                    shader_location: input.location,
                }])
            })
            .collect::<Result<Vec<_>, String>>()?;

        let buffers = layout
            .inputs
            .iter()
            .zip(&attributes)
            .map(|(input, attributes)| wgpu::VertexBufferLayout {
                array_stride: (input.components as usize * std::mem::size_of::<f32>())
                    as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect::<Vec<_>>();

        let vertex_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Stage"),
            source: wgpu::ShaderSource::Wgsl(vertex.source.as_str().into()),
        });
        let fragment_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fragment Stage"),
            source: wgpu::ShaderSource::Wgsl(fragment.source.as_str().into()),
        });

        Ok(self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Forward Pipeline"),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(&layout.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some(&layout.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.colour_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: self.depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            }))
    }

    fn record_draw(&mut self, index_count: u32) -> Result<(), String> {
        let program_id = self.current_program.ok_or("no program in use")?;
        let vertex_array_id = self.bound_vertex_array.ok_or("no vertex array bound")?;
        let program = self
            .programs
            .get(&program_id)
            .ok_or("program in use was destroyed")?;
        let vertex_array = self
            .vertex_arrays
            .get(&vertex_array_id)
            .ok_or("bound vertex array was destroyed")?;

        let live_buffer = |id: &BufferId| self.buffers.get(id).and_then(Option::as_ref).cloned();

        let index_buffer = vertex_array
            .index_buffer
            .as_ref()
            .and_then(live_buffer)
            .ok_or("vertex array has no index data")?;
        let vertex_buffers = program
            .layout
            .inputs
            .iter()
            .map(|input| {
                vertex_array
                    .attributes
                    .get(&input.location)
                    .and_then(live_buffer)
                    .ok_or_else(|| format!("no vertex data for `{}`", input.name))
            })
            .collect::<Result<Vec<_>, String>>()?;

        let uniforms = (!program.staging.is_empty()).then(|| {
            let alignment = self.device.limits().min_uniform_buffer_offset_alignment as usize;
            let offset = self.frame.uniforms.len().next_multiple_of(alignment);
            self.frame.uniforms.resize(offset, 0);
            self.frame.uniforms.extend_from_slice(&program.staging);
            (offset as u64, program.staging.len() as u64)
        });

        self.frame.draws.push(DrawCall {
            pipeline: program.pipeline.clone(),
            vertex_buffers,
            index_buffer,
            index_count,
            uniforms,
        });
        Ok(())
    }
}

impl Gpu for WgpuGpu {
    fn create_vertex_array(&mut self) -> Result<VertexArrayId, GpuError> {
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id, VertexArray::default());
        Ok(id)
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            log::warn!("vertex array {} destroyed twice", vertex_array.0);
        }
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn create_buffer(&mut self) -> Result<BufferId, GpuError> {
        let id = BufferId(self.next());
        self.buffers.insert(id, None);
        Ok(id)
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        // Not `wgpu::Buffer::destroy`: a pending draw may still hold a clone of it.
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("buffer {} destroyed twice", buffer.0);
        }
    }

    fn upload_buffer(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<(), GpuError> {
        let Some(slot) = self.buffers.get_mut(&buffer) else {
            return Err(GpuError::UnknownHandle {
                what: "buffer",
                id: buffer.0,
            });
        };
        if data.is_empty() {
            return Ok(());
        }
        let max = self.device.limits().max_buffer_size;
        if data.len() as u64 > max {
            return Err(GpuError::AllocationFailed {
                what: "buffer",
                reason: format!("{} bytes exceeds the device limit of {max}", data.len()),
            });
        }
        let (usage, label) = match target {
            BufferTarget::Vertex => (wgpu::BufferUsages::VERTEX, "Vertex Buffer"),
            BufferTarget::Index => (wgpu::BufferUsages::INDEX, "Index Buffer"),
        };
        *slot = Some(
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: data,
                    usage,
                }),
        );
        Ok(())
    }

    fn vertex_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        location: u32,
        buffer: BufferId,
        _components: u32,
    ) {
        match self.vertex_arrays.get_mut(&vertex_array) {
            Some(state) => {
                state.attributes.insert(location, buffer);
            }
            None => log::warn!("vertex array {} is not alive", vertex_array.0),
        }
    }

    fn bind_index_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) {
        match self.vertex_arrays.get_mut(&vertex_array) {
            Some(state) => state.index_buffer = Some(buffer),
            None => log::warn!("vertex array {} is not alive", vertex_array.0),
        }
    }

    fn compile_stage(&mut self, source: &str, kind: StageKind) -> Result<StageId, String> {
        let compiled = wgsl::compile(source, kind)?;
        let id = StageId(self.next());
        self.stages.insert(id, compiled);
        Ok(id)
    }

    fn destroy_stage(&mut self, stage: StageId) {
        self.stages.remove(&stage);
    }

    fn link_program(&mut self, vertex: StageId, fragment: StageId) -> Result<ProgramId, String> {
        let (Some(vs), Some(fs)) = (self.stages.get(&vertex), self.stages.get(&fragment)) else {
            return Err(format!(
                "error: stage {} or {} is not a compiled stage",
                vertex.0, fragment.0
            ));
        };
        let layout = wgsl::link(vs, fs)?;
        let pipeline = self.build_pipeline(vs, fs, &layout)?;
        let staging = vec![0; layout.uniform_size() as usize];
        let id = ProgramId(self.next());
        self.programs.insert(
            id,
            Program {
                layout,
                pipeline,
                staging,
            },
        );
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.layout.attribute_location(name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<Slot> {
        self.programs
            .get(&program)?
            .layout
            .uniform(name)
            .map(|member| Slot(member.offset))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = Some(program);
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array;
    }

    fn set_uniform(&mut self, slot: Slot, value: UniformValue) {
        let Some(program) = self
            .current_program
            .and_then(|id| self.programs.get_mut(&id))
        else {
            log::warn!("uniform slot {} set with no program in use", slot.0);
            return;
        };
        let bytes = value.as_bytes();
        let start = slot.0 as usize;
        match program.staging.get_mut(start..start + bytes.len()) {
            Some(target) => target.copy_from_slice(bytes),
            None => log::warn!("uniform slot {} is outside the uniform block", slot.0),
        }
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        if index_count == 0 {
            return;
        }
        if let Err(reason) = self.record_draw(index_count) {
            log::warn!("draw skipped: {reason}");
        }
    }

    fn clear(&mut self, colour: [f32; 4]) {
        if !self.frame.draws.is_empty() {
            log::warn!(
                "dropping {} draws that were never submitted",
                self.frame.draws.len()
            );
        }
        let [r, g, b, a] = colour.map(f64::from);
        self.frame = Frame {
            clear: Some(wgpu::Color { r, g, b, a }),
            ..Default::default()
        };
    }

    fn clip_space_correction(&self) -> cgmath::Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX
    }
}
