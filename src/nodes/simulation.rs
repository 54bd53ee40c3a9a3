use serde::{Deserialize, Serialize};

use crate::foundation::core::Extent3;
use crate::foundation::error::TexflowResult;
use crate::graph::ports::PortValue;
use crate::graph::settings::{EditFlags, ResourceSettings};
use crate::graph::shape::ResolvedShape;
use crate::nodes::ProcessCtx;
use crate::render::arena::TextureHandle;
use crate::render::fluid::BorderMode;
use crate::render::kernel::{ComputeProgram, FIRE_PROGRAM, KernelParams};
use crate::render::resources::{ResourceKey, TargetOptions};
use crate::texture::format::{OutputChannel, OutputPrecision, TextureFormat};

pub(crate) const STATIC_WARNING: &str = "This node only runs in realtime graphs.";

/// Input ports, all optional.
pub(crate) const FIRE_INPUTS: [&str; 4] = ["temperature", "fuel", "velocity", "obstacles"];
/// Output ports besides `output`, which publishes the fire (reaction) field.
pub(crate) const FIRE_OUTPUTS: [&str; 5] =
    ["smoke", "velocity", "pressure", "temperature", "divergence"];

const AMBIENT_TEMPERATURE: f32 = 0.0;

/// Settings of the fire target: a single half-float channel holding the reaction field.
pub(crate) fn settings() -> ResourceSettings {
    ResourceSettings {
        output_channels: OutputChannel::R,
        output_precision: OutputPrecision::Half,
        double_buffered: true,
        edit_flags: EditFlags::SIZE,
        ..ResourceSettings::default()
    }
}

#[derive(Clone, Copy, Debug)]
struct Field {
    slot: &'static str,
    format: TextureFormat,
    double_buffered: bool,
}

const DENSITY: Field = Field {
    slot: "density",
    format: TextureFormat::R16Float,
    double_buffered: true,
};
const VELOCITY: Field = Field {
    slot: "velocity",
    format: TextureFormat::Rg16Float,
    double_buffered: true,
};
const PRESSURE: Field = Field {
    slot: "pressure",
    format: TextureFormat::R16Float,
    double_buffered: true,
};
const TEMPERATURE: Field = Field {
    slot: "temperature",
    format: TextureFormat::R16Float,
    double_buffered: true,
};
// Vorticity, then divergence, within one frame.
const SCRATCH: Field = Field {
    slot: "divergence",
    format: TextureFormat::R16Float,
    double_buffered: false,
};
const OBSTACLES: Field = Field {
    slot: "obstacles",
    format: TextureFormat::R8Unorm,
    double_buffered: false,
};
const AUX_FIELDS: [Field; 6] = [DENSITY, VELOCITY, PRESSURE, TEMPERATURE, SCRATCH, OBSTACLES];

/// Realtime 2D fire: a grid fluid solver carrying smoke, temperature and burning fuel.
///
/// Every persistent field is double buffered; each pass reads the read instance, writes the write
/// instance and swaps. The fire itself lives in the node's main target. A
/// [`GraphRuntime::reset_realtime`](crate::GraphRuntime::reset_realtime) clears every field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fire2DNode {
    /// Solid grid edges.
    pub border_mode: BorderMode,
    /// Jacobi iterations of the pressure solve.
    pub iterations: u32,
    /// Strength of the vorticity confinement force.
    pub vorticity_strength: f32,
    /// Smoke kept per frame.
    pub density_dissipation: f32,
    /// Upward acceleration per degree above ambient temperature.
    pub density_buoyancy: f32,
    /// Downward pull of smoke.
    pub density_weight: f32,
    /// Temperature injected per second by the `temperature` input.
    pub temperature_amount: f32,
    /// Heat kept per frame.
    pub temperature_dissipation: f32,
    /// Momentum kept per frame.
    pub velocity_dissipation: f32,
    /// Fuel burnt per second.
    pub reaction_decay: f32,
    /// Fuel injected per second by the `fuel` input.
    pub reaction_amount: f32,
    /// Fuel level below which burning fuel turns into smoke.
    pub reaction_extinguishment: f32,
}

impl Default for Fire2DNode {
    fn default() -> Self {
        Self {
            border_mode: BorderMode::NoBorders,
            iterations: 50,
            vorticity_strength: 1.0,
            density_dissipation: 0.99,
            density_buoyancy: 1.0,
            density_weight: 9.807,
            temperature_amount: 100.0,
            temperature_dissipation: 0.995,
            velocity_dissipation: 0.95,
            reaction_decay: 0.001,
            reaction_amount: 10.0,
            reaction_extinguishment: 0.05,
        }
    }
}

struct Sim<'p> {
    program: &'p ComputeProgram,
    grid: Extent3,
    dt: f32,
}

impl Sim<'_> {
    /// Run `kernel` from the read instance of `key` into its write instance, then swap.
    fn step(
        &self,
        ctx: &mut ProcessCtx<'_>,
        kernel: &str,
        key: ResourceKey,
        mut p: KernelParams,
    ) -> TexflowResult<()> {
        let target = ctx.target_at(key)?;
        p.set_texture("_Input", target.read_instance())
            .set_texture("_Output", target.write_instance())
            .set_float("_DeltaTime", self.dt);
        ctx.cmd.dispatch(self.program, kernel, &p, self.grid)?;
        ctx.resources.swap(key)
    }
}

fn read(ctx: &ProcessCtx<'_>, key: ResourceKey) -> TexflowResult<TextureHandle> {
    Ok(ctx.target_at(key)?.read_instance())
}

impl Fire2DNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        if !ctx.realtime {
            ctx.warn(STATIC_WARNING);
            return Ok(false);
        }
        ctx.clear_warning(STATIC_WARNING);

        for field in AUX_FIELDS {
            let key = ctx.slot(field.slot);
            let shape = ResolvedShape {
                format: field.format,
                ..ctx.shape
            };
            let opts = TargetOptions {
                double_buffered: field.double_buffered,
                ..TargetOptions::default()
            };
            ctx.resources.ensure(key, &shape, opts)?;
        }
        let program = ctx.program(FIRE_PROGRAM)?;
        let grid = ctx.extent(ctx.target()?.read_instance())?;
        let sim = Sim {
            program: &program,
            grid,
            dt: ctx.clock.delta_time,
        };
        let [density, velocity, pressure, temperature, scratch, obstacles] =
            AUX_FIELDS.map(|f| ctx.slot(f.slot));
        let reaction = ctx.key();

        if ctx.reset {
            for key in [density, velocity, pressure, temperature, reaction] {
                let mut p = KernelParams::default();
                p.set_texture("_Output", ctx.target_at(key)?.read_instance());
                ctx.cmd.dispatch(&program, "Clear", &p, grid)?;
            }
        }

        let obstacle_tex = read(ctx, obstacles)?;
        let mut p = KernelParams::default();
        p.set_int("_BorderMode", self.border_mode.code())
            .set_texture("_Output", obstacle_tex);
        if let Some(mask) = ctx.input_texture("obstacles") {
            p.set_texture("_Input", mask);
        }
        ctx.cmd.dispatch(&program, "Obstacles", &p, grid)?;

        if let Some(source) = ctx.input_texture("velocity") {
            let mut p = KernelParams::default();
            p.set_texture("_Source", source).set_float("_Amount", 1.0);
            sim.step(ctx, "Inject", velocity, p)?;
        }

        let advected = [
            (temperature, self.temperature_dissipation, 0.0),
            (density, self.density_dissipation, 0.0),
            (reaction, 1.0, self.reaction_decay),
        ];
        for (key, dissipation, decay) in advected {
            let mut p = KernelParams::default();
            p.set_texture("_Velocity", read(ctx, velocity)?)
                .set_texture("_Obstacles", obstacle_tex)
                .set_float("_Dissipation", dissipation)
                .set_float("_Decay", decay);
            sim.step(ctx, "Advect", key, p)?;
        }

        let mut p = KernelParams::default();
        p.set_texture("_Density", read(ctx, density)?)
            .set_texture("_Obstacles", obstacle_tex)
            .set_float("_Dissipation", self.velocity_dissipation)
            .set_float("_Weight", self.density_weight);
        sim.step(ctx, "AdvectVelocity", velocity, p)?;

        let mut p = KernelParams::default();
        p.set_texture("_Temperature", read(ctx, temperature)?)
            .set_float("_Buoyancy", self.density_buoyancy)
            .set_float("_Ambient", AMBIENT_TEMPERATURE);
        sim.step(ctx, "Buoyancy", velocity, p)?;

        for (port, key, amount) in [
            ("temperature", temperature, self.temperature_amount),
            ("fuel", reaction, self.reaction_amount),
        ] {
            if let Some(source) = ctx.input_texture(port) {
                let mut p = KernelParams::default();
                p.set_texture("_Source", source).set_float("_Amount", amount);
                sim.step(ctx, "Inject", key, p)?;
            }
        }

        let mut p = KernelParams::default();
        p.set_texture("_Reaction", read(ctx, reaction)?)
            .set_float("_Amount", 1.0)
            .set_float("_Extinguishment", self.reaction_extinguishment);
        sim.step(ctx, "Extinguishment", density, p)?;

        let scratch_tex = read(ctx, scratch)?;
        let mut p = KernelParams::default();
        p.set_texture("_Velocity", read(ctx, velocity)?)
            .set_texture("_Output", scratch_tex);
        ctx.cmd.dispatch(&program, "Vorticity", &p, grid)?;
        let mut p = KernelParams::default();
        p.set_texture("_Vorticity", scratch_tex)
            .set_float("_Strength", self.vorticity_strength);
        sim.step(ctx, "Confinement", velocity, p)?;

        let mut p = KernelParams::default();
        p.set_texture("_Velocity", read(ctx, velocity)?)
            .set_texture("_Obstacles", obstacle_tex)
            .set_texture("_Output", scratch_tex);
        ctx.cmd.dispatch(&program, "Divergence", &p, grid)?;
        for _ in 0..self.iterations {
            let mut p = KernelParams::default();
            p.set_texture("_Divergence", scratch_tex)
                .set_texture("_Obstacles", obstacle_tex);
            sim.step(ctx, "Jacobi", pressure, p)?;
        }

        let mut p = KernelParams::default();
        p.set_texture("_Pressure", read(ctx, pressure)?)
            .set_texture("_Obstacles", obstacle_tex);
        sim.step(ctx, "Project", velocity, p)?;

        let published = [
            read(ctx, density)?,
            read(ctx, velocity)?,
            read(ctx, pressure)?,
            read(ctx, temperature)?,
            scratch_tex,
        ];
        for (port, texture) in FIRE_OUTPUTS.into_iter().zip(published) {
            ctx.set_output(port, PortValue::Texture(texture));
        }
        ctx.set_output("output", PortValue::Texture(read(ctx, reaction)?));
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/simulation.rs"]
mod tests;
