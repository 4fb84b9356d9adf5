//! Scene graph construction.
//!
//! [`SceneGraph::build`] flattens an [`ImportedScene`] into render entities: one per
//! (node, mesh reference) pair, in depth-first pre-order, so a node's own meshes come before
//! anything in its subtree. World transforms compose as `parent * local`.
//!
//! Construction is all or nothing. Every mesh is validated before its GPU objects are created,
//! and if anything fails, the entities built so far are released before the error is returned.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    config::MaterialDefaults,
    data_structures::{
        entity::{MaterialParams, MeshHandles, RenderEntity},
        imported::{ImportedMesh, ImportedNode, ImportedScene},
    },
    error::{GeometryError, GpuError, Result},
    gpu::{BufferTarget, Gpu},
    pipelines::program::ProgramSlots,
};

const POSITION_COMPONENTS: u32 = 3;
const NORMAL_COMPONENTS: u32 = 3;

/// The entity collection of one render session.
///
/// Owns every entity and with it every mesh's GPU objects. Hand it back with
/// [`SceneGraph::release`] (or [`SceneGraph::clear`]) before the backend goes away.
#[derive(Debug, Default)]
pub struct SceneGraph {
    entities: Vec<RenderEntity>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<G: Gpu>(
        gpu: &mut G,
        scene: &ImportedScene,
        slots: &ProgramSlots,
        defaults: &MaterialDefaults,
    ) -> Result<Self> {
        let mut graph = Self::new();
        let mut builder = Builder {
            gpu,
            scene,
            slots,
            defaults,
        };
        match builder.visit(&scene.root, Matrix4::identity(), &mut graph.entities) {
            Ok(()) => {
                log::info!(
                    "built scene graph with {} entities from {} meshes",
                    graph.len(),
                    scene.meshes.len()
                );
                Ok(graph)
            }
            Err(e) => {
                log::error!("scene graph construction failed: {e}");
                graph.clear(builder.gpu);
                Err(e)
            }
        }
    }

    pub fn entities(&self) -> &[RenderEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Releases every entity's GPU objects and empties the collection.
    pub fn clear<G: Gpu>(&mut self, gpu: &mut G) {
        let released = self.entities.len();
        self.entities.drain(..).for_each(|entity| entity.release(gpu));
        if released > 0 {
            log::debug!("released {released} entities");
        }
    }

    pub fn release<G: Gpu>(mut self, gpu: &mut G) {
        self.clear(gpu);
    }
}

struct Builder<'a, G: Gpu> {
    gpu: &'a mut G,
    scene: &'a ImportedScene,
    slots: &'a ProgramSlots,
    defaults: &'a MaterialDefaults,
}

impl<G: Gpu> Builder<'_, G> {
    fn visit(
        &mut self,
        node: &ImportedNode,
        parent: Matrix4<f32>,
        entities: &mut Vec<RenderEntity>,
    ) -> Result<()> {
        let world = parent * node.transform;
        for &mesh_index in &node.meshes {
            entities.push(self.entity(mesh_index, world)?);
        }
        for child in &node.children {
            self.visit(child, world, entities)?;
        }
        Ok(())
    }

    fn entity(&mut self, mesh_index: usize, world: Matrix4<f32>) -> Result<RenderEntity> {
        let mesh = self
            .scene
            .meshes
            .get(mesh_index)
            .ok_or(GeometryError::MissingMesh {
                mesh: mesh_index,
                available: self.scene.meshes.len(),
            })?;
        let triangle_count = triangle_count(mesh_index, mesh.faces.len())?;
        let indices = triangle_indices(mesh_index, mesh)?;
        let normals = normals(mesh_index, mesh)?;

        let handles = MeshHandles::allocate(self.gpu)?;
        if let Err(e) = self.upload(&handles, &mesh.positions, &normals, &indices) {
            handles.release(self.gpu);
            return Err(e.into());
        }

        let material = self.scene.materials.get(mesh.material);
        if material.is_none() && !self.scene.materials.is_empty() {
            log::warn!(
                "mesh {mesh_index} uses material {} but the scene has {}, using defaults",
                mesh.material,
                self.scene.materials.len()
            );
        }

        Ok(RenderEntity::new(
            world,
            handles,
            triangle_count,
            MaterialParams::resolve(material, self.defaults),
        ))
    }

    fn upload(
        &mut self,
        handles: &MeshHandles,
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        indices: &[u32],
    ) -> Result<(), GpuError> {
        let gpu = &mut *self.gpu;
        gpu.upload_buffer(
            handles.positions(),
            BufferTarget::Vertex,
            bytemuck::cast_slice(positions),
        )?;
        gpu.upload_buffer(
            handles.normals(),
            BufferTarget::Vertex,
            bytemuck::cast_slice(normals),
        )?;
        gpu.upload_buffer(
            handles.indices(),
            BufferTarget::Index,
            bytemuck::cast_slice(indices),
        )?;

        let vertex_array = handles.vertex_array();
        if let Some(location) = self.slots.position {
            gpu.vertex_attribute(vertex_array, location, handles.positions(), POSITION_COMPONENTS);
        }
        if let Some(location) = self.slots.normal {
            gpu.vertex_attribute(vertex_array, location, handles.normals(), NORMAL_COMPONENTS);
        }
        gpu.bind_index_buffer(vertex_array, handles.indices());
        Ok(())
    }
}

/// The triangle count, if three indices per triangle still fit the `u32` draw count.
fn triangle_count(mesh_index: usize, faces: usize) -> Result<u32, GeometryError> {
    u32::try_from(faces)
        .ok()
        .filter(|count| count.checked_mul(3).is_some())
        .ok_or(GeometryError::TooManyFaces {
            mesh: mesh_index,
            faces,
        })
}

/// Flattens the face list into a triangle list, rejecting anything that is not a triangle.
fn triangle_indices(mesh_index: usize, mesh: &ImportedMesh) -> Result<Vec<u32>, GeometryError> {
    let vertex_count = mesh.positions.len();
    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    for (face_index, face) in mesh.faces.iter().enumerate() {
        if face.len() != 3 {
            return Err(GeometryError::FaceArity {
                mesh: mesh_index,
                face: face_index,
                index_count: face.len(),
            });
        }
        if let Some(&index) = face.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GeometryError::IndexOutOfRange {
                mesh: mesh_index,
                face: face_index,
                index,
                vertex_count,
            });
        }
        indices.extend_from_slice(face);
    }
    Ok(indices)
}

/// A mesh without normals gets zero normals; any other count mismatch is rejected.
fn normals(mesh_index: usize, mesh: &ImportedMesh) -> Result<Vec<[f32; 3]>, GeometryError> {
    if mesh.normals.len() == mesh.positions.len() {
        Ok(mesh.normals.clone())
    } else if mesh.normals.is_empty() {
        log::debug!("mesh {mesh_index} has no normals, uploading zeros");
        Ok(vec![[0.0; 3]; mesh.positions.len()])
    } else {
        Err(GeometryError::NormalCount {
            mesh: mesh_index,
            positions: mesh.positions.len(),
            normals: mesh.normals.len(),
        })
    }
}
