mod common;

use common::test_utils::*;
use forward_ngin::{
    MaterialDefaults, RecordingGpu, ShaderSources,
    cgmath::Matrix4,
    data_structures::{
        imported::{ImportedNode, ImportedScene},
        scene_graph::SceneGraph,
    },
    gpu::{Slot, UniformValue, recording::Command},
    pipelines::program::ShaderProgram,
    render::FrameRenderer,
};

fn setup(gpu: &mut RecordingGpu, scene: &ImportedScene) -> (ShaderProgram, SceneGraph) {
    let program = ShaderProgram::link(gpu, &ShaderSources::default()).expect("bundled program");
    let graph = SceneGraph::build(gpu, scene, program.slots(), &MaterialDefaults::default())
        .expect("scene graph");
    gpu.clear_commands();
    (program, graph)
}

fn teardown(gpu: &mut RecordingGpu, program: ShaderProgram, graph: SceneGraph) {
    graph.release(gpu);
    program.release(gpu);
    assert_no_leaks(gpu);
}

#[test]
fn draw_requests_three_indices_per_triangle() {
    let root = ImportedNode::default().with_meshes([0, 1, 2]);
    let scene = scene(root, vec![strip_mesh(1, 0), strip_mesh(5, 0), strip_mesh(12, 0)]);
    let mut gpu = RecordingGpu::new();
    let (program, graph) = setup(&mut gpu, &scene);

    FrameRenderer::new().render_frame(&mut gpu, graph.entities(), identity(), &program);

    assert_eq!(gpu.draw_calls(), vec![3, 15, 36]);
    teardown(&mut gpu, program, graph);
}

#[test]
fn uniforms_precede_every_draw() {
    let root = ImportedNode::default()
        .with_meshes([0])
        .with_child(ImportedNode::new(translation(0.0, 1.0, 0.0)).with_meshes([0]));
    let mut gpu = RecordingGpu::new();
    let (program, graph) = setup(&mut gpu, &scene(root, vec![triangle_mesh()]));

    FrameRenderer::new().render_frame(&mut gpu, graph.entities(), identity(), &program);

    let commands = gpu.commands();
    assert_eq!(commands[0], Command::UseProgram(program.handle()));
    // bind, six uniforms, draw, unbind
    let per_entity: Vec<&[Command]> = commands[1..].chunks(9).collect();
    assert_eq!(per_entity.len(), 2);
    for (entity, chunk) in graph.entities().iter().zip(per_entity) {
        assert_eq!(chunk[0], Command::BindVertexArray(Some(entity.handles().vertex_array())));
        assert!(chunk[1..7].iter().all(|c| matches!(c, Command::SetUniform { .. })));
        assert_eq!(chunk[7], Command::DrawIndexedTriangles { index_count: 3 });
        assert_eq!(chunk[8], Command::BindVertexArray(None));
    }
    teardown(&mut gpu, program, graph);
}

#[test]
fn final_transform_is_view_projection_times_world() {
    let mut gpu = RecordingGpu::new();
    let root = ImportedNode::new(translation(2.0, 0.0, 0.0)).with_meshes([0]);
    let (program, graph) = setup(&mut gpu, &scene(root, vec![triangle_mesh()]));
    let view_projection = Matrix4::from_nonuniform_scale(1.0, 2.0, 3.0);

    FrameRenderer::new().render_frame(&mut gpu, graph.entities(), view_projection, &program);

    let lwp = program.slots().lwp_matrix.expect("lwp slot");
    let uploaded = gpu.commands().iter().find_map(|c| match c {
        Command::SetUniform {
            slot,
            value: UniformValue::Mat4(m),
        } if *slot == lwp => Some(Matrix4::from(*m)),
        _ => None,
    });
    assert_close(
        uploaded.expect("matrix upload"),
        view_projection * translation(2.0, 0.0, 0.0),
    );
    teardown(&mut gpu, program, graph);
}

#[test]
fn material_uniforms_land_in_their_slots() {
    let mut gpu = RecordingGpu::new();
    let (program, graph) = setup(&mut gpu, &single_mesh_scene(triangle_mesh()));

    FrameRenderer::new().render_frame(&mut gpu, graph.entities(), identity(), &program);

    let uploads: Vec<(Slot, UniformValue)> = gpu
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetUniform { slot, value } => Some((*slot, *value)),
            _ => None,
        })
        .collect();
    let slots = program.slots();
    let material = red_material();
    let expected = [
        (slots.diffuse, UniformValue::Vec4(material.diffuse.unwrap())),
        (slots.ambient, UniformValue::Vec4(material.ambient.unwrap())),
        (slots.specular, UniformValue::Vec4(material.specular.unwrap())),
        (slots.emission, UniformValue::Vec4([0.0; 4])),
        (slots.shininess, UniformValue::Float(64.0)),
    ];
    for (slot, value) in expected {
        assert!(uploads.contains(&(slot.unwrap(), value)), "{slot:?} = {value:?}");
    }
    teardown(&mut gpu, program, graph);
}

#[test]
fn zero_triangle_entity_is_a_no_op_draw() {
    let mut gpu = RecordingGpu::new();
    let (program, graph) = setup(&mut gpu, &single_mesh_scene(strip_mesh(0, 0)));

    FrameRenderer::new().render_frame(&mut gpu, graph.entities(), identity(), &program);

    assert_eq!(gpu.draw_calls(), vec![0]);
    assert!(gpu.violations().is_empty());
    teardown(&mut gpu, program, graph);
}

#[test]
fn empty_scene_only_binds_the_program() {
    let mut gpu = RecordingGpu::new();
    let (program, graph) = setup(&mut gpu, &scene(ImportedNode::default(), vec![]));

    FrameRenderer::new().render_frame(&mut gpu, graph.entities(), identity(), &program);

    assert_eq!(gpu.commands(), &[Command::UseProgram(program.handle())]);
    teardown(&mut gpu, program, graph);
}
