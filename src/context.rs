use cgmath::{Matrix4, SquareMatrix};

use crate::{
    camera::{Camera, Projection},
    config::RenderConfig,
    data_structures::{imported::ImportedScene, scene_graph::SceneGraph},
    error::{ConfigError, Result},
    gpu::Gpu,
    pipelines::program::{ShaderProgram, ShaderSources},
    render::FrameRenderer,
};

/// One render session: init, any number of frames, teardown.
///
/// The context owns the backend (or a `&mut` borrow of it), the linked program and the scene
/// graph. It is created on the thread that holds the GPU context and stays there.
#[derive(Debug)]
pub struct Context<G: Gpu> {
    gpu: G,
    program: ShaderProgram,
    scene: SceneGraph,
    renderer: FrameRenderer,
    pub camera: Camera,
    pub projection: Projection,
    config: RenderConfig,
    model_rotation: Matrix4<f32>,
}

impl<G: Gpu> Context<G> {
    /// Validates `config`, links the program and builds the scene graph, in that order.
    ///
    /// A shader that does not compile or link stops startup before any mesh is uploaded. If the
    /// scene graph cannot be built, the program is released again; either way nothing is left
    /// allocated on the backend when this returns an error.
    pub fn new(
        mut gpu: G,
        imported: &ImportedScene,
        shaders: &ShaderSources,
        config: RenderConfig,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyViewport { width, height }.into());
        }

        let program = ShaderProgram::link(&mut gpu, shaders)?;
        let scene = match SceneGraph::build(
            &mut gpu,
            imported,
            program.slots(),
            &config.material_defaults,
        ) {
            Ok(scene) => scene,
            Err(e) => {
                program.release(&mut gpu);
                return Err(e);
            }
        };

        log::info!("render session ready with {} entities", scene.len());
        Ok(Self {
            gpu,
            program,
            scene,
            renderer: FrameRenderer::new(),
            camera: Camera::new(config.camera_eye, config.camera_target),
            projection: Projection::new(
                width,
                height,
                config.fov,
                config.near_plane,
                config.far_plane,
            ),
            config,
            model_rotation: Matrix4::identity(),
        })
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Applied to the whole scene before the camera, e.g. to spin the model.
    pub fn set_model_rotation(&mut self, rotation: Matrix4<f32>) {
        self.model_rotation = rotation;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.projection.resize(width, height);
        }
    }

    /// `correction * projection * view * model_rotation`.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.gpu.clip_space_correction()
            * self.projection.matrix()
            * self.camera.view()
            * self.model_rotation
    }

    /// Clears and draws one frame. With [`WgpuGpu`](crate::WgpuGpu) the frame is only recorded;
    /// call `submit` on the backend before the next `render`, or the frame is dropped.
    pub fn render(&mut self) {
        let view_projection = self.view_projection();
        self.gpu.clear(self.config.clear_colour);
        self.renderer.render_frame(
            &mut self.gpu,
            self.scene.entities(),
            view_projection,
            &self.program,
        );
    }

    /// Releases every entity and the program, and hands the backend back.
    pub fn teardown(self) -> G {
        let Self {
            mut gpu,
            program,
            scene,
            ..
        } = self;
        scene.release(&mut gpu);
        program.release(&mut gpu);
        log::info!("render session torn down");
        gpu
    }
}
