//! Render entities and the GPU objects they own.

use cgmath::Matrix4;

use crate::{
    config::MaterialDefaults,
    data_structures::imported::ImportedMaterial,
    error::GpuError,
    gpu::{BufferId, Gpu, VertexArrayId},
};

/// The four GPU objects behind one drawable mesh.
///
/// Move-only: the handles are never copied out, shared with another entity or pooled. They are
/// destroyed together, exactly once, by [`MeshHandles::release`]. Dropping a set that was never
/// released leaks it on the GPU and logs a warning.
#[derive(Debug)]
pub struct MeshHandles {
    vertex_array: VertexArrayId,
    positions: BufferId,
    normals: BufferId,
    indices: BufferId,
}

impl MeshHandles {
    /// Creates a fresh vertex array and three buffers. If any of them cannot be created, the
    /// ones that were are destroyed again before the error is returned.
    pub fn allocate<G: Gpu>(gpu: &mut G) -> Result<Self, GpuError> {
        let vertex_array = gpu.create_vertex_array()?;
        let mut buffers = Vec::with_capacity(3);
        for _ in 0..3 {
            match gpu.create_buffer() {
                Ok(buffer) => buffers.push(buffer),
                Err(e) => {
                    buffers.into_iter().for_each(|b| gpu.destroy_buffer(b));
                    gpu.destroy_vertex_array(vertex_array);
                    return Err(e);
                }
            }
        }
        log::debug!(
            "allocated vertex array {} with buffers {:?}",
            vertex_array.index(),
            buffers.iter().map(|b| b.index()).collect::<Vec<_>>()
        );
        Ok(Self {
            vertex_array,
            positions: buffers[0],
            normals: buffers[1],
            indices: buffers[2],
        })
    }

    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    pub fn positions(&self) -> BufferId {
        self.positions
    }

    pub fn normals(&self) -> BufferId {
        self.normals
    }

    pub fn indices(&self) -> BufferId {
        self.indices
    }

    pub fn release<G: Gpu>(self, gpu: &mut G) {
        gpu.destroy_buffer(self.positions);
        gpu.destroy_buffer(self.normals);
        gpu.destroy_buffer(self.indices);
        gpu.destroy_vertex_array(self.vertex_array);
        log::debug!("released vertex array {}", self.vertex_array.index());
        std::mem::forget(self);
    }
}

impl Drop for MeshHandles {
    fn drop(&mut self) {
        log::warn!(
            "vertex array {} and its buffers were dropped without being released",
            self.vertex_array.index()
        );
    }
}

/// Colours and shininess as uploaded to the material uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub diffuse: [f32; 4],
    pub ambient: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    pub shininess: f32,
}

impl MaterialParams {
    /// Fills every channel the imported material leaves empty from `defaults`.
    pub fn resolve(material: Option<&ImportedMaterial>, defaults: &MaterialDefaults) -> Self {
        let material = material.copied().unwrap_or_default();
        Self {
            diffuse: material.diffuse.unwrap_or(defaults.diffuse),
            ambient: material.ambient.unwrap_or(defaults.ambient),
            specular: material.specular.unwrap_or(defaults.specular),
            emission: material.emissive.unwrap_or(defaults.emissive),
            shininess: material.shininess.unwrap_or(defaults.shininess),
        }
    }
}

/// One drawable instance of a mesh.
///
/// `world_transform` is stored as composed (`parent * local`, column-major) and uploaded as is;
/// it is never transposed.
#[derive(Debug)]
pub struct RenderEntity {
    pub world_transform: Matrix4<f32>,
    pub triangle_count: u32,
    pub material: MaterialParams,
    handles: MeshHandles,
}

impl RenderEntity {
    pub fn new(
        world_transform: Matrix4<f32>,
        handles: MeshHandles,
        triangle_count: u32,
        material: MaterialParams,
    ) -> Self {
        Self {
            world_transform,
            triangle_count,
            material,
            handles,
        }
    }

    pub fn handles(&self) -> &MeshHandles {
        &self.handles
    }

    /// Saturates instead of wrapping; the scene graph never builds an entity where it would.
    pub fn index_count(&self) -> u32 {
        self.triangle_count.saturating_mul(3)
    }

    pub fn release<G: Gpu>(self, gpu: &mut G) {
        self.handles.release(gpu);
    }
}
