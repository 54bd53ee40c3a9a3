use super::*;
use crate::render::arena::TextureArena;
use crate::render::cpu::{CpuCompute, CpuComputeOpts};
use crate::render::kernel::{
    CommandBuffer, ComputeBackend, GENERATE_PROGRAM, KernelParams, ProgramRegistry,
};
use crate::texture::format::{TextureDimension, TextureFormat};
use crate::texture::storage::{FilterMode, MipOptions, TextureDesc, WrapMode};

fn render(kernel: &str, w: u32, h: u32, mut params: KernelParams) -> Texture {
    let mut arena = TextureArena::default();
    let out = arena.allocate(TextureDesc {
        extent: Extent3::new(w, h, 1),
        format: TextureFormat::Rgba32Float,
        dimension: TextureDimension::Texture2D,
        wrap: WrapMode::Repeat,
        filter: FilterMode::Bilinear,
        mips: MipOptions::default(),
    });
    params.set_texture("_Output", out);
    let program = ProgramRegistry::builtin().get(GENERATE_PROGRAM).unwrap();
    let mut cmd = CommandBuffer::default();
    cmd.dispatch(&program, kernel, &params, Extent3::new(w, h, 1))
        .unwrap();
    CpuCompute::new(&CpuComputeOpts::default())
        .unwrap()
        .submit(cmd.commands(), &mut arena)
        .unwrap();
    arena.get(out).unwrap().clone()
}

#[test]
fn checker_alternates_cells() {
    let mut p = KernelParams::default();
    p.set_int("_Cells", 2)
        .set_vector("_ColorA", [1.0; 4])
        .set_vector("_ColorB", [0.0, 0.0, 0.0, 1.0]);
    let t = render("Checker", 4, 4, p);
    assert_eq!(t.load(0, 0, 0), [1.0; 4]);
    assert_eq!(t.load(2, 0, 0), [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(t.load(2, 2, 0), [1.0; 4]);
}

#[test]
fn zero_cells_fail() {
    let mut arena = TextureArena::default();
    let out = arena.allocate(TextureDesc {
        extent: Extent3::new(2, 2, 1),
        format: TextureFormat::Rgba8Unorm,
        dimension: TextureDimension::Texture2D,
        wrap: WrapMode::Repeat,
        filter: FilterMode::Point,
        mips: MipOptions::default(),
    });
    let mut p = KernelParams::default();
    p.set_int("_Cells", 0)
        .set_vector("_ColorA", [1.0; 4])
        .set_vector("_ColorB", [0.0; 4])
        .set_texture("_Output", out);
    let program = ProgramRegistry::builtin().get(GENERATE_PROGRAM).unwrap();
    let mut cmd = CommandBuffer::default();
    cmd.dispatch(&program, "Checker", &p, Extent3::new(2, 2, 1))
        .unwrap();
    let err = CpuCompute::new(&CpuComputeOpts::default())
        .unwrap()
        .submit(cmd.commands(), &mut arena)
        .unwrap_err();
    assert!(err.to_string().contains("_Cells"));
}

#[test]
fn dot_with_zero_radius_seeds_one_texel() {
    let mut p = KernelParams::default();
    p.set_float("_Radius", 0.0)
        .set_vector("_Center", [0.5, 0.5, 0.0, 0.0])
        .set_vector("_Color", [1.0; 4])
        .set_vector("_Background", [0.0, 0.0, 0.0, 1.0]);
    let t = render("Dot", 8, 8, p);
    let lit: Vec<usize> = t
        .texels()
        .iter()
        .enumerate()
        .filter(|(_, px)| px[0] > 0.5)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(lit, vec![4 * 8 + 4]);
}

#[test]
fn dot_radius_grows_a_disc() {
    let mut p = KernelParams::default();
    p.set_float("_Radius", 2.0)
        .set_vector("_Center", [0.5, 0.5, 0.0, 0.0])
        .set_vector("_Color", [1.0; 4])
        .set_vector("_Background", [0.0; 4]);
    let t = render("Dot", 16, 16, p);
    assert_eq!(t.load(10, 8, 0), [1.0; 4]);
    assert_eq!(t.load(11, 8, 0), [0.0; 4]);
    assert_eq!(t.load(9, 9, 0), [1.0; 4]);
}

#[test]
fn noise_is_deterministic_per_seed_and_in_range() {
    let params = |seed: i32| {
        let mut p = KernelParams::default();
        p.set_float("_Frequency", 3.0).set_int("_Seed", seed);
        p
    };
    let a = render("Noise", 16, 16, params(1));
    let b = render("Noise", 16, 16, params(1));
    let c = render("Noise", 16, 16, params(2));
    assert_eq!(a.texels(), b.texels());
    assert_ne!(a.texels(), c.texels());
    assert!(
        a.texels()
            .iter()
            .all(|px| (0.0..1.0).contains(&px[0]) && px[3] == 1.0)
    );
}
