//! WGSL program compilation and linking.
//!
//! Each stage is parsed and validated with naga before any GPU object is
//! created, so compile and link failures surface as [`ShaderError`]s with the
//! compiler's diagnostic instead of a device-lost panic inside wgpu.

use std::borrow::Cow;

/// Pipeline stage of a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Errors produced while building a program.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// A stage failed to parse or validate.
    Compile {
        program: String,
        stage: ShaderStage,
        diagnostic: String,
    },
    /// Both stages compiled but do not fit together.
    Link { program: String, reason: String },
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderError::Compile {
                program,
                stage,
                diagnostic,
            } => write!(f, "Failed to compile {} shader of program '{}':\n{}", stage, program, diagnostic),
            ShaderError::Link { program, reason } => {
                write!(f, "Failed to link program '{}': {}", program, reason)
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// Vertex and fragment WGSL source for one program.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ProgramSource {
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Vertex layout and bindings a program expects.
///
/// The renderer supports a fixed set of layouts; targets build their
/// pipelines from this instead of reflecting over the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramLayout {
    /// `[x, y, u, v]` per vertex, samples one texture.
    Textured,
    /// `[x, y, r, g, b, a]` per vertex.
    Colored,
    /// Unit quad corners per vertex plus one `ParticleInstance` per instance.
    Particles,
}

/// A stage that passed parsing and validation.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub entry_point: String,
    varyings: Vec<(u32, naga::TypeInner)>,
}

/// The result of a successful link.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
}

/// Parse, validate and link both stages of `source`.
pub fn link_program(name: &str, source: &ProgramSource) -> Result<LinkedProgram, ShaderError> {
    let vertex = compile_stage(name, ShaderStage::Vertex, &source.vertex)?;
    let fragment = compile_stage(name, ShaderStage::Fragment, &source.fragment)?;

    for (location, ty) in &fragment.varyings {
        match vertex.varyings.iter().find(|(l, _)| l == location) {
            None => {
                return Err(ShaderError::Link {
                    program: name.to_string(),
                    reason: format!(
                        "fragment input @location({}) is not written by vertex entry point '{}'",
                        location, vertex.entry_point
                    ),
                });
            }
            Some((_, vertex_ty)) if vertex_ty != ty => {
                return Err(ShaderError::Link {
                    program: name.to_string(),
                    reason: format!(
                        "@location({}) is {:?} in the vertex stage but {:?} in the fragment stage",
                        location, vertex_ty, ty
                    ),
                });
            }
            Some(_) => {}
        }
    }

    Ok(LinkedProgram { vertex, fragment })
}

/// Parse and validate a single stage.
///
/// For the vertex stage the recorded varyings are the entry point's
/// `@location` outputs; for the fragment stage they are its `@location`
/// inputs.
pub fn compile_stage(program: &str, stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let compile_error = |diagnostic: String| ShaderError::Compile {
        program: program.to_string(),
        stage,
        diagnostic,
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| compile_error(e.emit_to_string(source)))?;

    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::default())
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage)
        .ok_or_else(|| compile_error(format!("no @{} entry point", stage)))?;

    let mut varyings = Vec::new();
    match stage {
        ShaderStage::Vertex => {
            if let Some(result) = &entry.function.result {
                collect_locations(&module, result.ty, result.binding.as_ref(), &mut varyings);
            }
        }
        ShaderStage::Fragment => {
            for arg in &entry.function.arguments {
                collect_locations(&module, arg.ty, arg.binding.as_ref(), &mut varyings);
            }
        }
    }

    tracing::trace!("Compiled {} stage of '{}' ({} varyings)", stage, program, varyings.len());

    Ok(CompiledStage {
        entry_point: entry.name.clone(),
        varyings,
    })
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<(u32, naga::TypeInner)>,
) {
    let inner = &module.types[ty].inner;
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push((*location, inner.clone())),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}
