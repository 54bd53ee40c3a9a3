use std::time::Instant;

use rayon::prelude::*;

use crate::foundation::core::Extent3;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::render::arena::{TextureArena, TextureHandle};
use crate::render::kernel::{
    BLUR_PROGRAM, COLOR_PROGRAM, Command, ComputeBackend, DISTANCE_PROGRAM, Dispatch,
    FIRE_PROGRAM, GENERATE_PROGRAM, KernelParams, OUTPUT_PROGRAM, SampleTiming,
};
use crate::render::{filters, fluid, generate, jfa};
use crate::texture::storage::Texture;

/// Options of the CPU reference backend.
#[derive(Clone, Debug)]
pub struct CpuComputeOpts {
    /// Run kernels row-parallel on a rayon pool.
    pub parallel: bool,
    /// Worker count; `None` lets rayon decide.
    pub threads: Option<usize>,
}

impl Default for CpuComputeOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Counters of executed work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuComputeStats {
    /// Kernel dispatches executed.
    pub dispatches: u64,
    /// Texture copies executed.
    pub copies: u64,
    /// Mip chains rebuilt.
    pub mip_builds: u64,
}

/// CPU implementation of [`ComputeBackend`].
///
/// A dispatch moves the texture it writes out of the arena while the kernel runs, so kernels can
/// only observe textures they do not write.
pub struct CpuCompute {
    pool: Option<rayon::ThreadPool>,
    stats: CpuComputeStats,
}

impl std::fmt::Debug for CpuCompute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuCompute")
            .field("parallel", &self.pool.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl CpuCompute {
    /// Build the backend, creating a thread pool when `opts.parallel` is set.
    pub fn new(opts: &CpuComputeOpts) -> TexflowResult<Self> {
        let pool = if opts.parallel {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };
        Ok(Self {
            pool,
            stats: CpuComputeStats::default(),
        })
    }

    /// Work executed so far.
    pub fn stats(&self) -> CpuComputeStats {
        self.stats
    }

    fn run_dispatch(&mut self, d: &Dispatch, arena: &mut TextureArena) -> TexflowResult<()> {
        let target = d.written()?;
        let mut out = arena.lend(target)?;
        let result = {
            let ctx = KernelCtx {
                params: &d.params,
                arena,
                pool: self.pool.as_ref(),
                grid: d.grid,
            };
            execute(d, &ctx, &mut out)
        };
        if result.is_ok() && out.desc().mips.auto_generate {
            out.generate_mips();
        }
        arena.restore(target, out)?;
        self.stats.dispatches += 1;
        result
    }

    fn run_copy(
        &mut self,
        src: TextureHandle,
        dst: TextureHandle,
        arena: &mut TextureArena,
    ) -> TexflowResult<()> {
        let mut out = arena.lend(dst)?;
        let result = arena.require(src).and_then(|s| out.copy_from(s));
        if result.is_ok() && out.desc().mips.auto_generate {
            out.generate_mips();
        }
        arena.restore(dst, out)?;
        self.stats.copies += 1;
        result
    }
}

impl ComputeBackend for CpuCompute {
    #[tracing::instrument(skip_all, fields(commands = commands.len()))]
    fn submit(
        &mut self,
        commands: &[Command],
        arena: &mut TextureArena,
    ) -> TexflowResult<Vec<SampleTiming>> {
        let mut open: Vec<(&str, Instant)> = Vec::new();
        let mut timings = Vec::new();

        for command in commands {
            match command {
                Command::Dispatch(d) => self.run_dispatch(d, arena)?,
                Command::CopyTexture { src, dst } => self.run_copy(*src, *dst, arena)?,
                Command::GenerateMips { texture } => {
                    let t = arena
                        .get_mut(*texture)
                        .ok_or_else(|| TexflowError::not_found(format!("texture {texture}")))?;
                    t.generate_mips();
                    self.stats.mip_builds += 1;
                }
                Command::BeginSample { name } => open.push((name.as_str(), Instant::now())),
                Command::EndSample => {
                    let (name, start) = open.pop().ok_or_else(|| {
                        TexflowError::dispatch("end_sample without matching begin_sample")
                    })?;
                    timings.push(SampleTiming {
                        name: name.to_string(),
                        duration: start.elapsed(),
                    });
                }
            }
        }

        if let Some((name, _)) = open.last() {
            return Err(TexflowError::dispatch(format!(
                "profiling scope '{name}' was never closed"
            )));
        }
        Ok(timings)
    }
}

fn execute(d: &Dispatch, ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    match (d.program, d.kernel.name) {
        (DISTANCE_PROGRAM, "FillUVMap") => jfa::fill_uv_map(ctx, out),
        (DISTANCE_PROGRAM, "JumpFlooding") => jfa::jump_flooding(ctx, out),
        (DISTANCE_PROGRAM, "FinalPass") => jfa::final_pass(ctx, out),
        (BLUR_PROGRAM, "BlurHorizontal") => filters::blur(ctx, out, filters::Axis::X),
        (BLUR_PROGRAM, "BlurVertical") => filters::blur(ctx, out, filters::Axis::Y),
        (COLOR_PROGRAM, "Hsv") => filters::hsv(ctx, out),
        (COLOR_PROGRAM, "NormalFromHeight") => filters::normal_from_height(ctx, out),
        (COLOR_PROGRAM, "MaskCombine") => filters::mask_combine(ctx, out),
        (OUTPUT_PROGRAM, "Resample") => filters::resample(ctx, out),
        (GENERATE_PROGRAM, "Uniform") => generate::uniform(ctx, out),
        (GENERATE_PROGRAM, "Checker") => generate::checker(ctx, out),
        (GENERATE_PROGRAM, "Dot") => generate::dot(ctx, out),
        (GENERATE_PROGRAM, "Noise") => generate::noise(ctx, out),
        (FIRE_PROGRAM, "Clear") => fluid::clear(ctx, out),
        (FIRE_PROGRAM, "Obstacles") => fluid::obstacles(ctx, out),
        (FIRE_PROGRAM, "Inject") => fluid::inject(ctx, out),
        (FIRE_PROGRAM, "Advect") => fluid::advect(ctx, out),
        (FIRE_PROGRAM, "AdvectVelocity") => fluid::advect_velocity(ctx, out),
        (FIRE_PROGRAM, "Buoyancy") => fluid::buoyancy(ctx, out),
        (FIRE_PROGRAM, "Extinguishment") => fluid::extinguishment(ctx, out),
        (FIRE_PROGRAM, "Vorticity") => fluid::vorticity(ctx, out),
        (FIRE_PROGRAM, "Confinement") => fluid::confinement(ctx, out),
        (FIRE_PROGRAM, "Divergence") => fluid::divergence(ctx, out),
        (FIRE_PROGRAM, "Jacobi") => fluid::jacobi(ctx, out),
        (FIRE_PROGRAM, "Project") => fluid::project(ctx, out),
        (program, kernel) => Err(TexflowError::not_found(format!(
            "no CPU implementation for '{program}::{kernel}'"
        ))),
    }
}

/// Read-only view a kernel runs against.
pub(crate) struct KernelCtx<'a> {
    params: &'a KernelParams,
    arena: &'a TextureArena,
    pool: Option<&'a rayon::ThreadPool>,
    grid: Extent3,
}

impl<'a> KernelCtx<'a> {
    pub(crate) fn float(&self, name: &str) -> TexflowResult<f32> {
        self.params.float(name)
    }

    pub(crate) fn int(&self, name: &str) -> TexflowResult<i32> {
        self.params.int(name)
    }

    pub(crate) fn vector(&self, name: &str) -> TexflowResult<[f32; 4]> {
        self.params.vector(name)
    }

    /// Texture bound for reading under `name`.
    pub(crate) fn read(&self, name: &str) -> TexflowResult<&'a Texture> {
        let handle = self.params.texture(name)?;
        self.arena.get(handle).ok_or_else(|| {
            TexflowError::dispatch(format!("texture '{name}' ({handle}) is not readable"))
        })
    }

    /// Texture bound under `name`, `None` when unbound.
    pub(crate) fn read_optional(&self, name: &str) -> TexflowResult<Option<&'a Texture>> {
        match self.params.texture(name) {
            Ok(_) => self.read(name).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Evaluate `f` for every texel of `out` inside the dispatch grid and store the result.
    ///
    /// Rows run in parallel when the backend has a pool.
    pub(crate) fn for_each_texel<F>(&self, out: &mut Texture, f: F)
    where
        F: Fn(u32, u32, u32) -> [f32; 4] + Sync,
    {
        let e = out.extent();
        let format = out.format();
        let grid = self.grid;
        let width = e.width as usize;
        let height = e.height.max(1) as usize;
        let row = |(r, chunk): (usize, &mut [[f32; 4]])| {
            let y = (r % height) as u32;
            let z = (r / height) as u32;
            if y >= grid.height || z >= grid.depth {
                return;
            }
            for (x, t) in chunk.iter_mut().enumerate().take(grid.width as usize) {
                *t = format.quantize(f(x as u32, y, z));
            }
        };
        let texels = out.texels_mut();
        match self.pool {
            Some(pool) => pool.install(|| {
                texels.par_chunks_mut(width.max(1)).enumerate().for_each(row)
            }),
            None => texels.chunks_mut(width.max(1)).enumerate().for_each(row),
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> TexflowResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TexflowError::validation(
            "compute 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TexflowError::dispatch(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
