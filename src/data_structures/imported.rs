//! The scene as handed over by an importer.
//!
//! Plain CPU data with no GPU state. The loaders in [`crate::resources`] produce it, but any
//! other importer (or a test) can build one by hand.

use cgmath::{Matrix4, SquareMatrix};

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedNode {
    /// Relative to the parent node.
    pub transform: Matrix4<f32>,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<ImportedNode>,
}

impl Default for ImportedNode {
    fn default() -> Self {
        Self {
            transform: Matrix4::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl ImportedNode {
    pub fn new(transform: Matrix4<f32>) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: ImportedNode) -> Self {
        self.children.push(child);
        self
    }

    /// Mesh references in this node and all of its descendants.
    pub fn mesh_reference_count(&self) -> usize {
        self.meshes.len()
            + self
                .children
                .iter()
                .map(ImportedNode::mesh_reference_count)
                .sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Each face should hold exactly three vertex indices.
    pub faces: Vec<Vec<u32>>,
    /// Index into [`ImportedScene::materials`].
    pub material: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImportedMaterial {
    pub diffuse: Option<[f32; 4]>,
    pub ambient: Option<[f32; 4]>,
    pub specular: Option<[f32; 4]>,
    pub emissive: Option<[f32; 4]>,
    pub shininess: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedScene {
    pub root: ImportedNode,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
}
