//! Per-frame draw dispatch.
//!
//! One forward pass: every entity is drawn once, in collection order, with the linked program.
//! Each draw is preceded by a full upload of the entity's uniforms, so no draw ever sees state
//! left behind by the previous one. Slots the program does not expose are skipped.

use cgmath::Matrix4;

use crate::{
    data_structures::entity::RenderEntity,
    gpu::{Gpu, Slot, UniformValue},
    pipelines::program::ShaderProgram,
};

#[derive(Debug, Default)]
pub struct FrameRenderer;

impl FrameRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_frame<G: Gpu>(
        &self,
        gpu: &mut G,
        entities: &[RenderEntity],
        view_projection: Matrix4<f32>,
        program: &ShaderProgram,
    ) {
        gpu.use_program(program.handle());
        let slots = program.slots();
        for entity in entities {
            gpu.bind_vertex_array(Some(entity.handles().vertex_array()));

            let material = &entity.material;
            upload(gpu, slots.lwp_matrix, view_projection * entity.world_transform);
            upload(gpu, slots.diffuse, material.diffuse);
            upload(gpu, slots.ambient, material.ambient);
            upload(gpu, slots.specular, material.specular);
            upload(gpu, slots.emission, material.emission);
            upload(gpu, slots.shininess, material.shininess);

            gpu.draw_indexed_triangles(entity.index_count());
            gpu.bind_vertex_array(None);
        }
    }
}

fn upload<G: Gpu>(gpu: &mut G, slot: Option<Slot>, value: impl Into<UniformValue>) {
    if let Some(slot) = slot {
        gpu.set_uniform(slot, value.into());
    }
}
