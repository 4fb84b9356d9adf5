use forward_ngin::{
    RecordingGpu,
    cgmath::{Matrix4, SquareMatrix, Vector3},
    data_structures::imported::{ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene},
    pipelines::program::ProgramSlots,
};

pub fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(x, y, z))
}

/// `faces` triangles over a strip of `faces + 2` vertices.
pub fn strip_mesh(faces: u32, material: usize) -> ImportedMesh {
    let vertices = faces as usize + 2;
    ImportedMesh {
        positions: (0..vertices)
            .map(|i| [i as f32, (i % 2) as f32, 0.0])
            .collect(),
        normals: vec![[0.0, 0.0, 1.0]; vertices],
        faces: (0..faces).map(|i| vec![i, i + 1, i + 2]).collect(),
        material,
    }
}

pub fn triangle_mesh() -> ImportedMesh {
    strip_mesh(1, 0)
}

/// A mesh with one triangle followed by one untriangulated quad.
pub fn quad_mesh() -> ImportedMesh {
    ImportedMesh {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        faces: vec![vec![0, 1, 2], vec![0, 1, 2, 3]],
        material: 0,
    }
}

pub fn red_material() -> ImportedMaterial {
    ImportedMaterial {
        diffuse: Some([1.0, 0.0, 0.0, 1.0]),
        ambient: Some([0.1, 0.0, 0.0, 1.0]),
        specular: Some([0.5, 0.5, 0.5, 1.0]),
        emissive: None,
        shininess: Some(64.0),
    }
}

pub fn scene(root: ImportedNode, meshes: Vec<ImportedMesh>) -> ImportedScene {
    ImportedScene {
        root,
        meshes,
        materials: vec![red_material()],
    }
}

/// One root node referencing a single mesh.
pub fn single_mesh_scene(mesh: ImportedMesh) -> ImportedScene {
    scene(ImportedNode::default().with_meshes([0]), vec![mesh])
}

/// Root -> A -> B, each translated along a different axis, each referencing mesh 0.
pub fn chain_scene() -> ImportedScene {
    let b = ImportedNode::new(translation(0.0, 0.0, 3.0)).with_meshes([0]);
    let a = ImportedNode::new(translation(0.0, 2.0, 0.0))
        .with_meshes([0])
        .with_child(b);
    let root = ImportedNode::new(translation(1.0, 0.0, 0.0))
        .with_meshes([0])
        .with_child(a);
    scene(root, vec![triangle_mesh()])
}

/// The attribute locations the bundled program resolves to.
pub fn bundled_slots() -> ProgramSlots {
    ProgramSlots {
        position: Some(0),
        normal: Some(1),
        ..Default::default()
    }
}

pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}

pub fn assert_no_leaks(gpu: &RecordingGpu) {
    assert_eq!(gpu.live_vertex_arrays(), 0, "vertex arrays leaked");
    assert_eq!(gpu.live_buffers(), 0, "buffers leaked");
    assert_eq!(gpu.live_stages(), 0, "stages leaked");
    assert_eq!(gpu.live_programs(), 0, "programs leaked");
    assert!(gpu.violations().is_empty(), "{:?}", gpu.violations());
}

pub fn fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn assert_close(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    let a: &[f32; 16] = actual.as_ref();
    let e: &[f32; 16] = expected.as_ref();
    for (x, y) in a.iter().zip(e) {
        assert!((x - y).abs() < 1e-5, "{actual:?} != {expected:?}");
    }
}
