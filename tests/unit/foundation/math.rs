use super::*;

#[test]
fn fnv_matches_reference_vector() {
    let mut h = Fnv1a64::new_default();
    h.write_bytes(b"a");
    assert_eq!(h.finish(), 0xaf63_dc4c_8601_ec8c);
}

#[test]
fn lattice_hash_is_deterministic_and_in_range() {
    for x in -4..4 {
        for y in -4..4 {
            let a = lattice_hash01(7, x, y, 0);
            let b = lattice_hash01(7, x, y, 0);
            assert_eq!(a.to_bits(), b.to_bits());
            assert!((0.0..1.0).contains(&a));
        }
    }
    assert_ne!(lattice_hash01(1, 0, 0, 0), lattice_hash01(2, 0, 0, 0));
}

#[test]
fn smoothstep_endpoints() {
    assert_eq!(smoothstep01(0.0), 0.0);
    assert_eq!(smoothstep01(1.0), 1.0);
    assert_eq!(smoothstep01(2.0), 1.0);
    assert!((smoothstep01(0.5) - 0.5).abs() < 1e-6);
}
