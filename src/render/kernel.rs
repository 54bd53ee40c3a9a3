use std::collections::BTreeMap;
use std::time::Duration;

use smallvec::SmallVec;

use crate::foundation::core::Extent3;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::render::arena::{TextureArena, TextureHandle};

/// Program hosting the jump-flood distance kernels.
pub const DISTANCE_PROGRAM: &str = "texflow/distance";
/// Program hosting the separable blur kernels.
pub const BLUR_PROGRAM: &str = "texflow/blur";
/// Program hosting the fixed color/normal/mask kernels.
pub const COLOR_PROGRAM: &str = "texflow/color";
/// Program hosting the procedural generators.
pub const GENERATE_PROGRAM: &str = "texflow/generate";
/// Program hosting the output resampling kernel.
pub const OUTPUT_PROGRAM: &str = "texflow/output";
/// Program hosting the fire simulation kernels.
pub const FIRE_PROGRAM: &str = "texflow/fire2d";

/// Parameter contract of one kernel: every listed name must be bound before it is dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelDecl {
    /// Kernel entry point name.
    pub name: &'static str,
    /// Required scalar float parameters.
    pub floats: &'static [&'static str],
    /// Required integer parameters.
    pub ints: &'static [&'static str],
    /// Required 4-component vector parameters.
    pub vectors: &'static [&'static str],
    /// Textures the kernel reads.
    pub reads: &'static [&'static str],
    /// Textures the kernel reads when bound.
    pub optional_reads: &'static [&'static str],
    /// The single texture the kernel writes.
    pub write: &'static str,
}

const DISTANCE_KERNELS: &[KernelDecl] = &[
    KernelDecl {
        name: "FillUVMap",
        floats: &["_Threshold", "_InputScaleFactor"],
        ints: &["_ThresholdMode"],
        vectors: &["_Size"],
        reads: &["_Input"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "JumpFlooding",
        floats: &["_Offset"],
        ints: &["_DistanceMode"],
        vectors: &["_Size"],
        reads: &["_Input"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "FinalPass",
        floats: &["_Distance", "_InputScaleFactor"],
        ints: &["_Mode", "_DistanceMode"],
        vectors: &["_Size"],
        reads: &["_Input", "_Output"],
        optional_reads: &[],
        write: "_FinalOutput",
    },
];

const BLUR_KERNELS: &[KernelDecl] = &[
    KernelDecl {
        name: "BlurHorizontal",
        floats: &["_Radius"],
        ints: &[],
        vectors: &[],
        reads: &["_Input"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "BlurVertical",
        floats: &["_Radius"],
        ints: &[],
        vectors: &[],
        reads: &["_Input"],
        optional_reads: &[],
        write: "_Output",
    },
];

const COLOR_KERNELS: &[KernelDecl] = &[
    KernelDecl {
        name: "Hsv",
        floats: &["_Hue", "_Saturation", "_Value"],
        ints: &[],
        vectors: &[],
        reads: &["_Input"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "NormalFromHeight",
        floats: &["_Strength"],
        ints: &[],
        vectors: &[],
        reads: &["_Input"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "MaskCombine",
        floats: &[],
        ints: &[],
        vectors: &["_Defaults"],
        reads: &[],
        optional_reads: &["_Metallic", "_Occlusion", "_Detail", "_Smoothness"],
        write: "_Output",
    },
];

const GENERATE_KERNELS: &[KernelDecl] = &[
    KernelDecl {
        name: "Uniform",
        floats: &[],
        ints: &[],
        vectors: &["_Color"],
        reads: &[],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Checker",
        floats: &[],
        ints: &["_Cells"],
        vectors: &["_ColorA", "_ColorB"],
        reads: &[],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Dot",
        floats: &["_Radius"],
        ints: &[],
        vectors: &["_Center", "_Color", "_Background"],
        reads: &[],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Noise",
        floats: &["_Frequency"],
        ints: &["_Seed"],
        vectors: &[],
        reads: &[],
        optional_reads: &[],
        write: "_Output",
    },
];

const OUTPUT_KERNELS: &[KernelDecl] = &[KernelDecl {
    name: "Resample",
    floats: &[],
    ints: &[],
    vectors: &[],
    reads: &["_Input"],
    optional_reads: &[],
    write: "_Output",
}];

const FIRE_KERNELS: &[KernelDecl] = &[
    KernelDecl {
        name: "Clear",
        floats: &[],
        ints: &[],
        vectors: &[],
        reads: &[],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Obstacles",
        floats: &[],
        ints: &["_BorderMode"],
        vectors: &[],
        reads: &[],
        optional_reads: &["_Input"],
        write: "_Output",
    },
    KernelDecl {
        name: "Inject",
        floats: &["_Amount", "_DeltaTime"],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Source"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Advect",
        floats: &["_DeltaTime", "_Dissipation", "_Decay"],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Velocity", "_Obstacles"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "AdvectVelocity",
        floats: &["_DeltaTime", "_Dissipation", "_Weight"],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Density", "_Obstacles"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Buoyancy",
        floats: &["_DeltaTime", "_Buoyancy", "_Ambient"],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Temperature"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Extinguishment",
        floats: &["_Amount", "_Extinguishment"],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Reaction"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Vorticity",
        floats: &[],
        ints: &[],
        vectors: &[],
        reads: &["_Velocity"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Confinement",
        floats: &["_DeltaTime", "_Strength"],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Vorticity"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Divergence",
        floats: &[],
        ints: &[],
        vectors: &[],
        reads: &["_Velocity", "_Obstacles"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Jacobi",
        floats: &[],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Divergence", "_Obstacles"],
        optional_reads: &[],
        write: "_Output",
    },
    KernelDecl {
        name: "Project",
        floats: &[],
        ints: &[],
        vectors: &[],
        reads: &["_Input", "_Pressure", "_Obstacles"],
        optional_reads: &[],
        write: "_Output",
    },
];

/// A named set of kernels, the CPU analogue of a compute shader asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComputeProgram {
    name: &'static str,
    kernels: &'static [KernelDecl],
}

impl ComputeProgram {
    /// Build a program from a static kernel table.
    pub const fn new(name: &'static str, kernels: &'static [KernelDecl]) -> Self {
        Self { name, kernels }
    }

    /// Program name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Kernel table.
    pub fn kernels(&self) -> &'static [KernelDecl] {
        self.kernels
    }

    /// Look up a kernel by entry point name.
    pub fn find_kernel(&self, name: &str) -> TexflowResult<&'static KernelDecl> {
        self.kernels
            .iter()
            .find(|k| k.name == name)
            .ok_or_else(|| TexflowError::not_found(format!("kernel '{name}' in '{}'", self.name)))
    }
}

/// Programs available to nodes, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct ProgramRegistry {
    programs: BTreeMap<&'static str, ComputeProgram>,
}

impl ProgramRegistry {
    /// Registry with every program shipped with the crate.
    pub fn builtin() -> Self {
        let mut r = Self::default();
        r.register(ComputeProgram::new(DISTANCE_PROGRAM, DISTANCE_KERNELS));
        r.register(ComputeProgram::new(BLUR_PROGRAM, BLUR_KERNELS));
        r.register(ComputeProgram::new(COLOR_PROGRAM, COLOR_KERNELS));
        r.register(ComputeProgram::new(GENERATE_PROGRAM, GENERATE_KERNELS));
        r.register(ComputeProgram::new(OUTPUT_PROGRAM, OUTPUT_KERNELS));
        r.register(ComputeProgram::new(FIRE_PROGRAM, FIRE_KERNELS));
        r
    }

    /// Add or replace a program.
    pub fn register(&mut self, program: ComputeProgram) {
        self.programs.insert(program.name, program);
    }

    /// Remove a program, returning it if present.
    pub fn unregister(&mut self, name: &str) -> Option<ComputeProgram> {
        self.programs.remove(name)
    }

    /// Look up a program by name.
    pub fn get(&self, name: &str) -> TexflowResult<ComputeProgram> {
        self.programs
            .get(name)
            .copied()
            .ok_or_else(|| TexflowError::not_found(format!("compute program '{name}'")))
    }
}

/// Named, typed parameter block bound to a dispatch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernelParams {
    floats: SmallVec<[(&'static str, f32); 4]>,
    ints: SmallVec<[(&'static str, i32); 4]>,
    vectors: SmallVec<[(&'static str, [f32; 4]); 4]>,
    textures: SmallVec<[(&'static str, TextureHandle); 4]>,
}

fn upsert<T>(list: &mut SmallVec<[(&'static str, T); 4]>, name: &'static str, value: T) {
    match list.iter_mut().find(|(n, _)| *n == name) {
        Some(slot) => slot.1 = value,
        None => list.push((name, value)),
    }
}

fn lookup<T: Copy>(list: &[(&'static str, T)], name: &str) -> Option<T> {
    list.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

impl KernelParams {
    /// Set a float parameter.
    pub fn set_float(&mut self, name: &'static str, v: f32) -> &mut Self {
        upsert(&mut self.floats, name, v);
        self
    }

    /// Set an integer parameter.
    pub fn set_int(&mut self, name: &'static str, v: i32) -> &mut Self {
        upsert(&mut self.ints, name, v);
        self
    }

    /// Set a vector parameter.
    pub fn set_vector(&mut self, name: &'static str, v: [f32; 4]) -> &mut Self {
        upsert(&mut self.vectors, name, v);
        self
    }

    /// Bind a texture.
    pub fn set_texture(&mut self, name: &'static str, t: TextureHandle) -> &mut Self {
        upsert(&mut self.textures, name, t);
        self
    }

    /// Read a float parameter.
    pub fn float(&self, name: &str) -> TexflowResult<f32> {
        lookup(&self.floats, name).ok_or_else(|| missing("float", name))
    }

    /// Read an integer parameter.
    pub fn int(&self, name: &str) -> TexflowResult<i32> {
        lookup(&self.ints, name).ok_or_else(|| missing("int", name))
    }

    /// Read a vector parameter.
    pub fn vector(&self, name: &str) -> TexflowResult<[f32; 4]> {
        lookup(&self.vectors, name).ok_or_else(|| missing("vector", name))
    }

    /// Read a texture binding.
    pub fn texture(&self, name: &str) -> TexflowResult<TextureHandle> {
        lookup(&self.textures, name).ok_or_else(|| missing("texture", name))
    }

    fn validate(&self, decl: &KernelDecl) -> TexflowResult<()> {
        for f in decl.floats {
            self.float(f)?;
        }
        for i in decl.ints {
            self.int(i)?;
        }
        for v in decl.vectors {
            self.vector(v)?;
        }
        let write = self.texture(decl.write)?;
        for r in decl.reads {
            self.texture(r)?;
        }
        let bound = decl
            .reads
            .iter()
            .chain(decl.optional_reads)
            .filter_map(|r| lookup(&self.textures, r).map(|h| (r, h)));
        for (r, h) in bound {
            if h == write {
                return Err(TexflowError::hazard(format!(
                    "kernel '{}' reads '{r}' from {write}, which it also writes as '{}'",
                    decl.name, decl.write
                )));
            }
        }
        Ok(())
    }
}

fn missing(kind: &str, name: &str) -> TexflowError {
    TexflowError::dispatch(format!("missing {kind} parameter '{name}'"))
}

/// A recorded kernel invocation with its parameter snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    /// Program name.
    pub program: &'static str,
    /// Kernel contract.
    pub kernel: &'static KernelDecl,
    /// Parameters at record time.
    pub params: KernelParams,
    /// Thread grid, one invocation per texel.
    pub grid: Extent3,
}

impl Dispatch {
    /// Texture written by this dispatch.
    pub fn written(&self) -> TexflowResult<TextureHandle> {
        self.params.texture(self.kernel.write)
    }

    /// Textures read by this dispatch, in declaration order.
    pub fn reads(&self) -> SmallVec<[TextureHandle; 4]> {
        self.kernel
            .reads
            .iter()
            .chain(self.kernel.optional_reads)
            .filter_map(|r| self.params.texture(r).ok())
            .collect()
    }
}

/// One recorded GPU-style command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Run a kernel.
    Dispatch(Dispatch),
    /// Copy every texel of `src` into `dst` (same extent).
    CopyTexture {
        /// Source texture.
        src: TextureHandle,
        /// Destination texture.
        dst: TextureHandle,
    },
    /// Rebuild the mip chain of a texture.
    GenerateMips {
        /// Texture whose chain is rebuilt.
        texture: TextureHandle,
    },
    /// Open a named profiling scope.
    BeginSample {
        /// Scope name.
        name: String,
    },
    /// Close the innermost profiling scope.
    EndSample,
}

/// Ordered list of commands recorded during one graph run.
///
/// Recording validates bindings, so a command buffer never contains a dispatch that reads and
/// writes the same texture.
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Record a kernel dispatch after checking its parameter contract.
    pub fn dispatch(
        &mut self,
        program: &ComputeProgram,
        kernel: &str,
        params: &KernelParams,
        grid: Extent3,
    ) -> TexflowResult<()> {
        let decl = program.find_kernel(kernel)?;
        if grid.texel_count() == 0 {
            return Err(TexflowError::dispatch(format!(
                "kernel '{kernel}' dispatched over an empty grid"
            )));
        }
        params.validate(decl)?;
        self.commands.push(Command::Dispatch(Dispatch {
            program: program.name(),
            kernel: decl,
            params: params.clone(),
            grid,
        }));
        Ok(())
    }

    /// Record a texture copy.
    pub fn copy_texture(&mut self, src: TextureHandle, dst: TextureHandle) -> TexflowResult<()> {
        if src == dst {
            return Err(TexflowError::hazard(format!(
                "copy from {src} into itself"
            )));
        }
        self.commands.push(Command::CopyTexture { src, dst });
        Ok(())
    }

    /// Record a mip chain rebuild.
    pub fn generate_mips(&mut self, texture: TextureHandle) {
        self.commands.push(Command::GenerateMips { texture });
    }

    /// Open a profiling scope.
    pub fn begin_sample(&mut self, name: impl Into<String>) {
        self.commands.push(Command::BeginSample { name: name.into() });
    }

    /// Close the innermost profiling scope.
    pub fn end_sample(&mut self) {
        self.commands.push(Command::EndSample);
    }

    /// Recorded commands in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Return `true` when nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// GPU-side duration of one profiling scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleTiming {
    /// Scope name.
    pub name: String,
    /// Measured duration.
    pub duration: Duration,
}

/// Executes recorded command lists against the texture arena.
pub trait ComputeBackend {
    /// Execute `commands` in recording order and return the timings of every closed scope.
    fn submit(
        &mut self,
        commands: &[Command],
        arena: &mut TextureArena,
    ) -> TexflowResult<Vec<SampleTiming>>;
}

#[cfg(test)]
#[path = "../../tests/unit/render/kernel.rs"]
mod tests;
