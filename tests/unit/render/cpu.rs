use super::*;
use crate::render::kernel::{CommandBuffer, ProgramRegistry};
use crate::texture::format::{TextureDimension, TextureFormat};
use crate::texture::storage::{FilterMode, MipOptions, TextureDesc, WrapMode};

fn desc(w: u32, h: u32) -> TextureDesc {
    TextureDesc {
        extent: Extent3::new(w, h, 1),
        format: TextureFormat::Rgba32Float,
        dimension: TextureDimension::Texture2D,
        wrap: WrapMode::Clamp,
        filter: FilterMode::Point,
        mips: MipOptions::default(),
    }
}

fn serial() -> CpuCompute {
    CpuCompute::new(&CpuComputeOpts {
        parallel: false,
        threads: None,
    })
    .unwrap()
}

#[test]
fn zero_threads_is_rejected() {
    let err = CpuCompute::new(&CpuComputeOpts {
        parallel: true,
        threads: Some(0),
    })
    .unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn uniform_dispatch_fills_the_written_texture() {
    let mut arena = TextureArena::default();
    let t = arena.allocate(desc(3, 2));
    let program = ProgramRegistry::builtin().get(GENERATE_PROGRAM).unwrap();
    let mut params = KernelParams::default();
    params
        .set_vector("_Color", [0.25, 0.5, 0.75, 1.0])
        .set_texture("_Output", t);
    let mut cmd = CommandBuffer::default();
    cmd.dispatch(&program, "Uniform", &params, Extent3::new(3, 2, 1))
        .unwrap();

    let mut cpu = serial();
    cpu.submit(cmd.commands(), &mut arena).unwrap();
    assert!(
        arena
            .get(t)
            .unwrap()
            .texels()
            .iter()
            .all(|&px| px == [0.25, 0.5, 0.75, 1.0])
    );
    assert_eq!(cpu.stats().dispatches, 1);
}

#[test]
fn dispatch_grid_limits_written_texels() {
    let mut arena = TextureArena::default();
    let t = arena.allocate(desc(4, 4));
    let program = ProgramRegistry::builtin().get(GENERATE_PROGRAM).unwrap();
    let mut params = KernelParams::default();
    params.set_vector("_Color", [1.0; 4]).set_texture("_Output", t);
    let mut cmd = CommandBuffer::default();
    cmd.dispatch(&program, "Uniform", &params, Extent3::new(2, 1, 1))
        .unwrap();
    serial().submit(cmd.commands(), &mut arena).unwrap();

    let tex = arena.get(t).unwrap();
    assert_eq!(tex.load(1, 0, 0), [1.0; 4]);
    assert_eq!(tex.load(2, 0, 0), [0.0; 4]);
    assert_eq!(tex.load(0, 1, 0), [0.0; 4]);
}

#[test]
fn copies_and_samples_run_in_recording_order() {
    let mut arena = TextureArena::default();
    let a = arena.allocate(desc(2, 2));
    let b = arena.allocate(desc(2, 2));
    arena.get_mut(a).unwrap().fill([0.5, 0.0, 0.0, 1.0]);

    let mut cmd = CommandBuffer::default();
    cmd.begin_sample("outer");
    cmd.begin_sample("inner");
    cmd.copy_texture(a, b).unwrap();
    cmd.end_sample();
    cmd.end_sample();

    let mut cpu = serial();
    let timings = cpu.submit(cmd.commands(), &mut arena).unwrap();
    let names: Vec<&str> = timings.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["inner", "outer"]);
    assert_eq!(arena.get(b).unwrap().load(1, 1, 0), [0.5, 0.0, 0.0, 1.0]);
    assert_eq!(cpu.stats().copies, 1);
}

#[test]
fn unbalanced_samples_are_dispatch_errors() {
    let mut arena = TextureArena::default();
    let mut cmd = CommandBuffer::default();
    cmd.begin_sample("never closed");
    let err = serial().submit(cmd.commands(), &mut arena).unwrap_err();
    assert!(err.to_string().contains("never closed"));

    let mut cmd = CommandBuffer::default();
    cmd.end_sample();
    assert!(serial().submit(cmd.commands(), &mut arena).is_err());
}

#[test]
fn released_target_fails_the_submit() {
    let mut arena = TextureArena::default();
    let t = arena.allocate(desc(2, 2));
    let program = ProgramRegistry::builtin().get(GENERATE_PROGRAM).unwrap();
    let mut params = KernelParams::default();
    params.set_vector("_Color", [1.0; 4]).set_texture("_Output", t);
    let mut cmd = CommandBuffer::default();
    cmd.dispatch(&program, "Uniform", &params, Extent3::new(2, 2, 1))
        .unwrap();
    arena.release(t);

    let err = serial().submit(cmd.commands(), &mut arena).unwrap_err();
    assert!(err.to_string().starts_with("resource not found:"));
}

#[test]
fn parallel_and_serial_execution_agree() {
    let program = ProgramRegistry::builtin().get(GENERATE_PROGRAM).unwrap();
    let run = |parallel: bool| {
        let mut arena = TextureArena::default();
        let t = arena.allocate(desc(17, 9));
        let mut params = KernelParams::default();
        params
            .set_float("_Frequency", 4.0)
            .set_int("_Seed", 7)
            .set_texture("_Output", t);
        let mut cmd = CommandBuffer::default();
        cmd.dispatch(&program, "Noise", &params, Extent3::new(17, 9, 1))
            .unwrap();
        let mut cpu = CpuCompute::new(&CpuComputeOpts {
            parallel,
            threads: Some(2),
        })
        .unwrap();
        cpu.submit(cmd.commands(), &mut arena).unwrap();
        arena.get(t).unwrap().texels().to_vec()
    };
    assert_eq!(run(true), run(false));
}

#[test]
fn auto_generated_mips_follow_dispatches() {
    let mut arena = TextureArena::default();
    let mut d = desc(4, 4);
    d.mips = MipOptions {
        has_mips: true,
        auto_generate: true,
    };
    let t = arena.allocate(d);
    let program = ProgramRegistry::builtin().get(GENERATE_PROGRAM).unwrap();
    let mut params = KernelParams::default();
    params.set_vector("_Color", [1.0; 4]).set_texture("_Output", t);
    let mut cmd = CommandBuffer::default();
    cmd.dispatch(&program, "Uniform", &params, Extent3::new(4, 4, 1))
        .unwrap();
    serial().submit(cmd.commands(), &mut arena).unwrap();

    let tex = arena.get(t).unwrap();
    assert_eq!(tex.mip(2).unwrap(), &[[1.0; 4]]);
}
