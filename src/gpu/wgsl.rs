//! WGSL front end shared by the backends.
//!
//! Compilation is naga's parse + validate, with diagnostics rendered against the source text.
//! Linking checks the two stages against each other and reflects the slots a program exposes:
//! vertex inputs by `@location`, uniforms by byte offset inside the block bound at
//! `@group(0) @binding(0)`.

use naga::{AddressSpace, Binding, Module, ScalarKind, ShaderStage, TypeInner, VectorSize};

use super::StageKind;

pub const UNIFORM_GROUP: u32 = 0;
pub const UNIFORM_BINDING: u32 = 0;

#[derive(Debug)]
pub struct CompiledStage {
    pub kind: StageKind,
    pub source: String,
    pub entry_point: String,
    pub module: Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Vec4,
    Float,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub size: u32,
    pub members: Vec<UniformMember>,
}

impl UniformBlock {
    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    pub components: u32,
}

/// What a linked program exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLayout {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub inputs: Vec<VertexInput>,
    pub uniforms: Option<UniformBlock>,
}

impl ProgramLayout {
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.inputs.iter().find(|i| i.name == name).map(|i| i.location)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformMember> {
        self.uniforms.as_ref().and_then(|block| block.member(name))
    }

    pub fn uniform_size(&self) -> u32 {
        self.uniforms.as_ref().map_or(0, |block| block.size)
    }
}

fn naga_stage(kind: StageKind) -> ShaderStage {
    match kind {
        StageKind::Vertex => ShaderStage::Vertex,
        StageKind::Fragment => ShaderStage::Fragment,
    }
}

pub fn compile(source: &str, kind: StageKind) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let stage = naga_stage(kind);
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage)
        .map(|ep| ep.name.clone())
        .ok_or_else(|| format!("error: no @{kind} entry point in {kind} stage source"))?;

    Ok(CompiledStage {
        kind,
        source: source.to_string(),
        entry_point,
        module,
    })
}

pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<ProgramLayout, String> {
    if vertex.kind != StageKind::Vertex || fragment.kind != StageKind::Fragment {
        return Err(format!(
            "error: expected a vertex and a fragment stage, got {} and {}",
            vertex.kind, fragment.kind
        ));
    }

    let written = stage_outputs(&vertex.module, &vertex.entry_point);
    for input in stage_inputs(&fragment.module, &fragment.entry_point) {
        if !written.contains(&input.location) {
            return Err(format!(
                "error: fragment input `{}` at location {} is not written by the vertex stage",
                input.name, input.location
            ));
        }
    }

    let uniforms = match (uniform_block(&vertex.module), uniform_block(&fragment.module)) {
        (Some(v), Some(f)) => Some(merge_blocks(v, f)?),
        (v, f) => v.or(f),
    };

    Ok(ProgramLayout {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        inputs: stage_inputs(&vertex.module, &vertex.entry_point),
        uniforms,
    })
}

fn merge_blocks(mut vertex: UniformBlock, fragment: UniformBlock) -> Result<UniformBlock, String> {
    for member in fragment.members {
        match vertex.member(&member.name) {
            Some(existing) if *existing != member => {
                return Err(format!(
                    "error: uniform `{}` is declared differently in the vertex and fragment stages",
                    member.name
                ));
            }
            Some(_) => {}
            None => vertex.members.push(member),
        }
    }
    vertex.size = vertex.size.max(fragment.size);
    Ok(vertex)
}

/// Reflects the uniform block at `@group(0) @binding(0)`, if the module declares one.
pub fn uniform_block(module: &Module) -> Option<UniformBlock> {
    let (_, global) = module.global_variables.iter().find(|(_, g)| {
        g.space == AddressSpace::Uniform
            && g.binding
                .as_ref()
                .is_some_and(|b| b.group == UNIFORM_GROUP && b.binding == UNIFORM_BINDING)
    })?;

    let ty = &module.types[global.ty];
    let block = match &ty.inner {
        TypeInner::Struct { members, span } => UniformBlock {
            size: *span,
            members: members
                .iter()
                .filter_map(|m| {
                    Some(UniformMember {
                        name: m.name.clone()?,
                        offset: m.offset,
                        kind: uniform_kind(&module.types[m.ty].inner),
                    })
                })
                .collect(),
        },
        inner => UniformBlock {
            size: inner.size(module.to_ctx()),
            members: vec![UniformMember {
                name: global.name.clone().unwrap_or_default(),
                offset: 0,
                kind: uniform_kind(inner),
            }],
        },
    };
    Some(block)
}

fn uniform_kind(inner: &TypeInner) -> UniformKind {
    match inner {
        TypeInner::Scalar(s) if s.kind == ScalarKind::Float && s.width == 4 => UniformKind::Float,
        TypeInner::Vector {
            size: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => UniformKind::Vec4,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.width == 4 => UniformKind::Mat4,
        _ => UniformKind::Other,
    }
}

fn components(inner: &TypeInner) -> u32 {
    match inner {
        TypeInner::Scalar(_) => 1,
        TypeInner::Vector { size, .. } => *size as u32,
        _ => 0,
    }
}

/// The `@location` inputs of an entry point, flattening struct arguments, sorted by location.
pub fn stage_inputs(module: &Module, entry_point: &str) -> Vec<VertexInput> {
    let Some(ep) = module.entry_points.iter().find(|ep| ep.name == entry_point) else {
        return Vec::new();
    };
    let mut inputs = Vec::new();
    for arg in &ep.function.arguments {
        let inner = &module.types[arg.ty].inner;
        match (&arg.binding, inner) {
            (Some(Binding::Location { location, .. }), _) => inputs.push(VertexInput {
                name: arg.name.clone().unwrap_or_default(),
                location: *location,
                components: components(inner),
            }),
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = &member.binding {
                        inputs.push(VertexInput {
                            name: member.name.clone().unwrap_or_default(),
                            location: *location,
                            components: components(&module.types[member.ty].inner),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    inputs.sort_by_key(|i| i.location);
    inputs
}

fn stage_outputs(module: &Module, entry_point: &str) -> Vec<u32> {
    let Some(result) = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry_point)
        .and_then(|ep| ep.function.result.as_ref())
    else {
        return Vec::new();
    };
    match (&result.binding, &module.types[result.ty].inner) {
        (Some(Binding::Location { location, .. }), _) => vec![*location],
        (None, TypeInner::Struct { members, .. }) => members
            .iter()
            .filter_map(|m| match &m.binding {
                Some(Binding::Location { location, .. }) => Some(*location),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
