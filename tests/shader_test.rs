mod common;

use common::test_utils::*;
use forward_ngin::{
    RecordingGpu, ShaderSources,
    error::ShaderError,
    gpu::{StageKind, recording::Command},
    pipelines::{
        forward,
        program::{self, ShaderProgram},
    },
};

fn is_link(command: &Command) -> bool {
    matches!(command, Command::LinkProgram { .. })
}

#[test]
fn bundled_program_resolves_every_slot() {
    let mut gpu = RecordingGpu::new();
    let program =
        ShaderProgram::link(&mut gpu, &ShaderSources::default()).expect("bundled program");

    let slots = program.slots();
    assert_eq!(slots.position, Some(0));
    assert_eq!(slots.normal, Some(1));
    assert!(slots.lwp_matrix.is_some());
    assert!(slots.diffuse.is_some());
    assert!(slots.ambient.is_some());
    assert!(slots.specular.is_some());
    assert!(slots.emission.is_some());
    assert!(slots.shininess.is_some());
    // stages are gone once the program is linked
    assert_eq!(gpu.live_stages(), 0);

    program.release(&mut gpu);
    assert_no_leaks(&gpu);
}

#[test]
fn malformed_vertex_stage_never_links() {
    let mut gpu = RecordingGpu::new();
    let sources = ShaderSources {
        vertex: "@vertex fn vs_main( -> @builtin(position) vec4<f32> {".to_string(),
        ..ShaderSources::default()
    };

    let err = ShaderProgram::link(&mut gpu, &sources).unwrap_err();
    let ShaderError::Compile { stage, log } = err else {
        panic!("expected a compile error, got {err}");
    };
    assert_eq!(stage, StageKind::Vertex);
    assert!(!log.trim().is_empty());
    assert!(!gpu.commands().iter().any(is_link));
    assert_eq!(
        gpu.commands(),
        &[Command::CompileStage {
            kind: StageKind::Vertex,
            result: None
        }]
    );
    assert_no_leaks(&gpu);
}

#[test]
fn malformed_fragment_stage_releases_vertex_stage() {
    let mut gpu = RecordingGpu::new();
    let sources = ShaderSources {
        fragment: "@fragment fn fs_main() -> @location(0) vec4<f32> { return undefined_value; }"
            .to_string(),
        ..ShaderSources::default()
    };

    let err = ShaderProgram::link(&mut gpu, &sources).unwrap_err();
    assert!(matches!(
        err,
        ShaderError::Compile {
            stage: StageKind::Fragment,
            ..
        }
    ));
    assert!(!gpu.commands().iter().any(is_link));
    assert_no_leaks(&gpu);
}

#[test]
fn stage_without_entry_point_fails_to_compile() {
    let mut gpu = RecordingGpu::new();
    let err = program::compile_stage(&mut gpu, &forward::sources().fragment, StageKind::Vertex)
        .unwrap_err();
    let ShaderError::Compile { log, .. } = err else {
        panic!("expected a compile error");
    };
    assert!(log.contains("@vertex"), "{log}");
}

#[test]
fn mismatched_interface_fails_to_link() {
    let mut gpu = RecordingGpu::new();
    let sources = ShaderSources {
        vertex: "@vertex fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {\n\
                     return vec4<f32>(p, 1.0);\n\
                 }"
        .to_string(),
        fragment: "@fragment fn fs_main(@location(3) c: vec4<f32>) -> @location(0) vec4<f32> {\n\
                       return c;\n\
                   }"
        .to_string(),
    };

    let err = ShaderProgram::link(&mut gpu, &sources).unwrap_err();
    let ShaderError::Link { log } = err else {
        panic!("expected a link error, got {err}");
    };
    assert!(log.contains("location 3"), "{log}");
    // both stages are released even though linking failed
    assert_no_leaks(&gpu);
}

#[test]
fn stripped_uniforms_resolve_to_none() {
    let mut gpu = RecordingGpu::new();
    let sources = ShaderSources {
        vertex: "struct Block { lwp_matrix: mat4x4<f32> }\n\
                 @group(0) @binding(0) var<uniform> block: Block;\n\
                 @vertex fn vs_main(@location(0) attr_pos: vec3<f32>)\n\
                     -> @builtin(position) vec4<f32> {\n\
                     return block.lwp_matrix * vec4<f32>(attr_pos, 1.0);\n\
                 }"
        .to_string(),
        fragment: "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }"
            .to_string(),
    };

    let program = ShaderProgram::link(&mut gpu, &sources).expect("minimal program");
    let slots = program.slots();
    assert_eq!(slots.position, Some(0));
    assert_eq!(slots.normal, None);
    assert!(slots.lwp_matrix.is_some());
    assert_eq!(slots.diffuse, None);
    assert_eq!(slots.shininess, None);

    program.release(&mut gpu);
    assert_no_leaks(&gpu);
}
