use super::*;
use crate::render::arena::{TextureArena, TextureHandle};
use crate::render::cpu::{CpuCompute, CpuComputeOpts};
use crate::render::kernel::{
    BLUR_PROGRAM, COLOR_PROGRAM, CommandBuffer, ComputeBackend, KernelParams, OUTPUT_PROGRAM,
    ProgramRegistry,
};
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

fn run(
    arena: &mut TextureArena,
    program: &str,
    kernel: &str,
    params: &KernelParams,
    out: TextureHandle,
) {
    let program = ProgramRegistry::builtin().get(program).unwrap();
    let grid = arena.get(out).unwrap().extent();
    let mut cmd = CommandBuffer::default();
    cmd.dispatch(&program, kernel, params, grid).unwrap();
    CpuCompute::new(&CpuComputeOpts::default())
        .unwrap()
        .submit(cmd.commands(), arena)
        .unwrap();
}

fn close(a: [f32; 4], b: [f32; 4]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
}

#[test]
fn gaussian_weights_are_normalized_and_symmetric() {
    let w = gaussian_weights(3).unwrap();
    assert_eq!(w.len(), 7);
    let sum: f32 = w.iter().sum();
    assert!((sum - 1.0).abs() < 1e-5);
    assert_eq!(w[0], w[6]);
    assert!(w[3] > w[2]);
    assert_eq!(gaussian_weights(0).unwrap(), vec![1.0]);
}

#[test]
fn blur_preserves_constant_images() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(8, 8));
    let dst = arena.allocate(desc(8, 8));
    arena.get_mut(src).unwrap().fill([0.3, 0.6, 0.9, 1.0]);
    let mut p = KernelParams::default();
    p.set_float("_Radius", 2.0)
        .set_texture("_Input", src)
        .set_texture("_Output", dst);
    run(&mut arena, BLUR_PROGRAM, "BlurHorizontal", &p, dst);
    let out = arena.get(dst).unwrap();
    assert!(close(out.load(0, 0, 0), [0.3, 0.6, 0.9, 1.0]));
    assert!(close(out.load(5, 7, 0), [0.3, 0.6, 0.9, 1.0]));
}

#[test]
fn horizontal_blur_spreads_only_along_x() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(9, 9));
    let dst = arena.allocate(desc(9, 9));
    arena.get_mut(src).unwrap().store(4, 4, 0, [1.0; 4]);
    let mut p = KernelParams::default();
    p.set_float("_Radius", 1.0)
        .set_texture("_Input", src)
        .set_texture("_Output", dst);
    run(&mut arena, BLUR_PROGRAM, "BlurHorizontal", &p, dst);
    let out = arena.get(dst).unwrap();
    assert!(out.load(3, 4, 0)[0] > 0.0);
    assert_eq!(out.load(4, 3, 0), [0.0; 4]);
}

#[test]
fn hsv_identity_keeps_color() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(2, 2));
    let dst = arena.allocate(desc(2, 2));
    arena.get_mut(src).unwrap().fill([0.8, 0.4, 0.2, 0.5]);
    let mut p = KernelParams::default();
    p.set_float("_Hue", 0.0)
        .set_float("_Saturation", 1.0)
        .set_float("_Value", 1.0)
        .set_texture("_Input", src)
        .set_texture("_Output", dst);
    run(&mut arena, COLOR_PROGRAM, "Hsv", &p, dst);
    assert!(close(
        arena.get(dst).unwrap().load(1, 1, 0),
        [0.8, 0.4, 0.2, 0.5]
    ));
}

#[test]
fn hsv_desaturates_to_value() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(1, 1));
    let dst = arena.allocate(desc(1, 1));
    arena.get_mut(src).unwrap().fill([1.0, 0.0, 0.0, 1.0]);
    let mut p = KernelParams::default();
    p.set_float("_Hue", 1.0 / 3.0)
        .set_float("_Saturation", 0.0)
        .set_float("_Value", 0.5)
        .set_texture("_Input", src)
        .set_texture("_Output", dst);
    run(&mut arena, COLOR_PROGRAM, "Hsv", &p, dst);
    assert!(close(
        arena.get(dst).unwrap().load(0, 0, 0),
        [0.5, 0.5, 0.5, 1.0]
    ));
}

#[test]
fn hue_rotation_by_a_third_turns_red_into_green() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(1, 1));
    let dst = arena.allocate(desc(1, 1));
    arena.get_mut(src).unwrap().fill([1.0, 0.0, 0.0, 1.0]);
    let mut p = KernelParams::default();
    p.set_float("_Hue", 1.0 / 3.0)
        .set_float("_Saturation", 1.0)
        .set_float("_Value", 1.0)
        .set_texture("_Input", src)
        .set_texture("_Output", dst);
    run(&mut arena, COLOR_PROGRAM, "Hsv", &p, dst);
    assert!(close(
        arena.get(dst).unwrap().load(0, 0, 0),
        [0.0, 1.0, 0.0, 1.0]
    ));
}

#[test]
fn flat_height_gives_up_facing_normal() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(4, 4));
    let dst = arena.allocate(desc(4, 4));
    arena.get_mut(src).unwrap().fill([0.5, 0.5, 0.5, 1.0]);
    let mut p = KernelParams::default();
    p.set_float("_Strength", 4.0)
        .set_texture("_Input", src)
        .set_texture("_Output", dst);
    run(&mut arena, COLOR_PROGRAM, "NormalFromHeight", &p, dst);
    assert!(close(
        arena.get(dst).unwrap().load(2, 2, 0),
        [0.5, 0.5, 1.0, 1.0]
    ));
}

#[test]
fn height_ramp_tilts_normal_against_the_slope() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(8, 1));
    let dst = arena.allocate(desc(8, 1));
    {
        let t = arena.get_mut(src).unwrap();
        for x in 0..8 {
            let h = x as f32 / 8.0;
            t.store(x, 0, 0, [h, h, h, 1.0]);
        }
    }
    let mut p = KernelParams::default();
    p.set_float("_Strength", 1.0)
        .set_texture("_Input", src)
        .set_texture("_Output", dst);
    run(&mut arena, COLOR_PROGRAM, "NormalFromHeight", &p, dst);
    let n = arena.get(dst).unwrap().load(4, 0, 0);
    assert!(n[0] < 0.5);
}

#[test]
fn mask_combine_uses_defaults_for_unbound_inputs() {
    let mut arena = TextureArena::default();
    let metallic = arena.allocate(desc(2, 2));
    let dst = arena.allocate(desc(2, 2));
    arena.get_mut(metallic).unwrap().fill([1.0, 1.0, 1.0, 1.0]);
    let mut p = KernelParams::default();
    p.set_vector("_Defaults", [0.0, 1.0, 0.0, 0.5])
        .set_texture("_Metallic", metallic)
        .set_texture("_Output", dst);
    run(&mut arena, COLOR_PROGRAM, "MaskCombine", &p, dst);
    assert!(close(
        arena.get(dst).unwrap().load(0, 0, 0),
        [1.0, 1.0, 0.0, 0.5]
    ));
}

#[test]
fn resample_scales_nearest_texels_with_point_filter() {
    let mut arena = TextureArena::default();
    let src = arena.allocate(desc(2, 2));
    let dst = arena.allocate(desc(4, 4));
    arena.get_mut(src).unwrap().store(1, 0, 0, [1.0; 4]);
    let mut p = KernelParams::default();
    p.set_texture("_Input", src).set_texture("_Output", dst);
    run(&mut arena, OUTPUT_PROGRAM, "Resample", &p, dst);
    let out = arena.get(dst).unwrap();
    assert_eq!(out.load(3, 0, 0), [1.0; 4]);
    assert_eq!(out.load(2, 1, 0), [1.0; 4]);
    assert_eq!(out.load(1, 1, 0), [0.0; 4]);
}
