//! Scene loaders.
//!
//! Both loaders produce an [`ImportedScene`] and nothing else; no GPU work happens here. Any
//! IO or parse failure comes back as an [`ImportError`] carrying the path and the full context
//! chain.

use std::path::Path;

use anyhow::Context as _;
use cgmath::Matrix4;

use crate::{
    data_structures::imported::{ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene},
    error::ImportError,
};

pub mod mesh;

/// Loads a `.gltf` or `.glb` file. Every primitive becomes one imported mesh; a node references
/// all primitives of its mesh.
pub fn load_scene_gltf(path: impl AsRef<Path>) -> Result<ImportedScene, ImportError> {
    let path = path.as_ref();
    let scene = read_gltf(path).map_err(|e| ImportError::new(path.display(), e))?;
    log::info!(
        "loaded {} with {} meshes and {} materials",
        path.display(),
        scene.meshes.len(),
        scene.materials.len()
    );
    Ok(scene)
}

fn read_gltf(path: &Path) -> anyhow::Result<ImportedScene> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).context("failed to parse glTF document")?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .context("failed to load glTF buffers")?;

    // Primitives without a material use the trailing default entry.
    let mut materials: Vec<ImportedMaterial> = document
        .materials()
        .map(|material| {
            let [r, g, b] = material.emissive_factor();
            ImportedMaterial {
                diffuse: Some(material.pbr_metallic_roughness().base_color_factor()),
                emissive: Some([r, g, b, 1.0]),
                ..Default::default()
            }
        })
        .collect();
    let default_material = materials.len();
    materials.push(ImportedMaterial::default());

    let mut meshes = Vec::new();
    let mut primitives_of_mesh = Vec::new();
    for gltf_mesh in document.meshes() {
        let mut primitives = Vec::new();
        for primitive in gltf_mesh.primitives() {
            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .with_context(|| {
                    format!(
                        "mesh {} has a primitive without positions",
                        gltf_mesh.index()
                    )
                })?
                .collect();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|normals| normals.collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            primitives.push(meshes.len());
            meshes.push(ImportedMesh {
                faces: mesh::gltf_faces(primitive.mode(), &indices),
                positions,
                normals,
                material: primitive.material().index().unwrap_or(default_material),
            });
        }
        primitives_of_mesh.push(primitives);
    }

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("glTF file contains no scene")?;
    let root = ImportedNode {
        children: scene
            .nodes()
            .map(|node| gltf_node(node, &primitives_of_mesh))
            .collect(),
        ..Default::default()
    };

    Ok(ImportedScene {
        root,
        meshes,
        materials,
    })
}

fn gltf_node(node: gltf::Node<'_>, primitives_of_mesh: &[Vec<usize>]) -> ImportedNode {
    ImportedNode {
        transform: Matrix4::from(node.transform().matrix()),
        meshes: node
            .mesh()
            .and_then(|mesh| primitives_of_mesh.get(mesh.index()).cloned())
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| gltf_node(child, primitives_of_mesh))
            .collect(),
    }
}

/// Loads a Wavefront `.obj` file and its `.mtl` library. Faces keep the arity they have in the
/// file; a single root node references every object.
pub fn load_scene_obj(path: impl AsRef<Path>) -> Result<ImportedScene, ImportError> {
    let path = path.as_ref();
    let scene = read_obj(path).map_err(|e| ImportError::new(path.display(), e))?;
    log::info!(
        "loaded {} with {} meshes and {} materials",
        path.display(),
        scene.meshes.len(),
        scene.materials.len()
    );
    Ok(scene)
}

fn read_obj(path: &Path) -> anyhow::Result<ImportedScene> {
    let (models, obj_materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: false,
            ..Default::default()
        },
    )
    .context("failed to parse OBJ file")?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("{}: no usable material library ({e}), using defaults", path.display());
        Vec::new()
    });
    let mut materials: Vec<ImportedMaterial> = obj_materials
        .iter()
        .map(|m| {
            let alpha = m.dissolve.unwrap_or(1.0);
            let rgba = |c: [f32; 3]| [c[0], c[1], c[2], alpha];
            ImportedMaterial {
                diffuse: m.diffuse.map(rgba),
                ambient: m.ambient.map(rgba),
                specular: m.specular.map(rgba),
                emissive: None,
                shininess: m.shininess,
            }
        })
        .collect();
    let default_material = materials.len();
    materials.push(ImportedMaterial::default());

    let meshes: Vec<ImportedMesh> = models
        .iter()
        .map(|model| {
            let data = &model.mesh;
            ImportedMesh {
                positions: triples(&data.positions),
                normals: triples(&data.normals),
                faces: mesh::obj_faces(&data.indices, &data.face_arities),
                material: data.material_id.unwrap_or(default_material),
            }
        })
        .collect();

    let root = ImportedNode::default().with_meshes(0..meshes.len());
    Ok(ImportedScene {
        root,
        meshes,
        materials,
    })
}

fn triples(values: &[f32]) -> Vec<[f32; 3]> {
    values
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}
