//! Error taxonomy.
//!
//! Every fatal condition aborts the phase that raised it: a failed import means no scene, a bad
//! face or a failed allocation means no scene graph, and a shader that does not compile or link
//! means no program. None of these are retried. A missing uniform or attribute is not an error at
//! all; it resolves to `None` and the corresponding upload is skipped.

use std::fmt;

use thiserror::Error;

use crate::gpu::StageKind;

/// The upstream importer could not produce a scene.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to import scene from {path}: {message}")]
pub struct ImportError {
    pub path: String,
    pub message: String,
}

impl ImportError {
    pub fn new(path: impl fmt::Display, err: anyhow::Error) -> Self {
        Self {
            path: path.to_string(),
            message: format!("{err:#}"),
        }
    }
}

/// Mesh data the scene-graph builder refuses to upload.
///
/// Faces must be triangulated before they reach the builder; a face of any other arity is never
/// truncated or re-fanned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("mesh {mesh} face {face} has {index_count} indices, expected 3")]
    FaceArity {
        mesh: usize,
        face: usize,
        index_count: usize,
    },
    #[error("mesh {mesh} face {face} references vertex {index} but the mesh has {vertex_count}")]
    IndexOutOfRange {
        mesh: usize,
        face: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("mesh {mesh} has {positions} positions but {normals} normals")]
    NormalCount {
        mesh: usize,
        positions: usize,
        normals: usize,
    },
    #[error("mesh {mesh} has {faces} faces, more than a 32-bit index count can draw")]
    TooManyFaces { mesh: usize, faces: usize },
    #[error("a node references mesh {mesh} but the scene has {available}")]
    MissingMesh { mesh: usize, available: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("failed to allocate {what}: {reason}")]
    AllocationFailed { what: &'static str, reason: String },
    #[error("{what} handle {id} is not alive")]
    UnknownHandle { what: &'static str, id: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("failed to compile {stage} stage:\n{log}")]
    Compile { stage: StageKind, log: String },
    #[error("failed to link program:\n{log}")]
    Link { log: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("near plane {near} must be positive and smaller than far plane {far}")]
    DepthRange { near: f32, far: f32 },
    #[error("field of view {0} degrees is outside (0, 180)")]
    FieldOfView(f32),
    #[error("camera eye and target coincide at {0:?}")]
    DegenerateCamera([f32; 3]),
    #[error("viewport {width}x{height} has no area")]
    EmptyViewport { width: u32, height: u32 },
}

/// Any error that stops a render session from starting.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
