use iriscode::distance::{fragile_bit, hamming, hamming_expectation, hamming_fragile_bit};
use iriscode::{IrisTemplate, OwnedGrid, PackedBundle};

fn template(code: &[u8], confidence: &[u8], width: usize) -> IrisTemplate {
    let height = code.len() / width;
    IrisTemplate::new(
        OwnedGrid::new(code.to_vec(), width, height).unwrap(),
        OwnedGrid::new(confidence.to_vec(), width, height).unwrap(),
    )
    .unwrap()
}

fn packed(template: &IrisTemplate, threshold: u8) -> PackedBundle<u8> {
    PackedBundle::pack(template, threshold).unwrap()
}

#[test]
fn hamming_worked_example() {
    // code1 = 10110000b, code2 = 00110000b, full masks -> 1/8.
    let t1 = template(&[1, 0, 1, 1, 0, 0, 0, 0], &[255; 8], 8);
    let t2 = template(&[0, 0, 1, 1, 0, 0, 0, 0], &[255; 8], 8);
    let score = hamming(&packed(&t1, 1), &packed(&t2, 1)).unwrap();
    assert!(score.valid);
    assert_eq!(score.value, 0.125);
}

#[test]
fn fragile_bit_worked_example() {
    // stable1 = 11110000b, stable2 = 11100000b, full masks:
    // jointly stable 3 of n = 8 -> 0.625.
    let t1 = template(&[0; 8], &[200, 200, 200, 200, 50, 50, 50, 50], 8);
    let t2 = template(&[0; 8], &[200, 200, 200, 50, 50, 50, 50, 50], 8);
    let score = fragile_bit(&packed(&t1, 100), &packed(&t2, 100)).unwrap();
    assert!(score.valid);
    assert_eq!(score.value, 0.625);
}

#[test]
fn self_distance_is_zero_with_full_mask() {
    let t = template(&[1, 0, 1, 1, 0, 1, 0, 0, 1, 1], &[255; 10], 5);
    let bundle = packed(&t, 1);
    let score = hamming(&bundle, &bundle).unwrap();
    assert!(score.valid);
    assert_eq!(score.value, 0.0);
}

#[test]
fn all_invalid_mask_fails_every_metric() {
    let t1 = template(&[1, 0, 1, 0], &[0; 4], 4);
    let t2 = template(&[1, 1, 0, 0], &[0; 4], 4);
    let (b1, b2) = (packed(&t1, 1), packed(&t2, 1));
    for score in [
        hamming(&b1, &b2).unwrap(),
        fragile_bit(&b1, &b2).unwrap(),
        hamming_fragile_bit(&b1, &b2, 0.5).unwrap(),
        hamming_expectation(&t1, &t2, 0).unwrap(),
    ] {
        assert!(!score.valid);
        assert_eq!(score.value, 1.0);
    }
}

#[test]
fn weighted_metric_interpolates_raw_numerators() {
    let t1 = template(
        &[1, 0, 1, 1, 0, 0, 1, 0],
        &[200, 200, 80, 200, 50, 200, 200, 0],
        8,
    );
    let t2 = template(
        &[1, 1, 1, 0, 0, 0, 1, 1],
        &[200, 50, 200, 200, 200, 80, 0, 200],
        8,
    );
    let (b1, b2) = (packed(&t1, 100), packed(&t2, 100));
    let plain = hamming(&b1, &b2).unwrap().value;
    let fragile = fragile_bit(&b1, &b2).unwrap().value;
    for alpha in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let mixed = hamming_fragile_bit(&b1, &b2, alpha).unwrap().value;
        let expected = alpha * fragile + (1.0 - alpha) * plain;
        assert!((mixed - expected).abs() < 1e-12, "alpha {alpha}");
    }
}

#[test]
fn weighted_metric_rejects_alpha_outside_unit_interval() {
    let t = template(&[1, 0], &[255, 255], 2);
    let b = packed(&t, 1);
    assert!(hamming_fragile_bit(&b, &b, -0.1).is_err());
    assert!(hamming_fragile_bit(&b, &b, 1.5).is_err());
}

#[test]
fn expectation_reduces_to_hamming_at_full_confidence() {
    // confidence 255 -> bit-flip probability 0, so the expected distance is
    // exactly the fraction of disagreeing code bits.
    let t1 = template(&[1, 0, 1, 1, 0, 0, 0, 0], &[255; 8], 8);
    let t2 = template(&[0, 0, 1, 1, 0, 0, 0, 0], &[255; 8], 8);
    let expected = hamming_expectation(&t1, &t2, 0).unwrap();
    assert!(expected.valid);
    assert!((expected.value - 0.125).abs() < 1e-12);
}

#[test]
fn expectation_counts_joint_validity_only() {
    // Second pixel is occluded on one side: only the first pixel counts.
    let t1 = template(&[1, 1], &[255, 0], 2);
    let t2 = template(&[1, 0], &[255, 255], 2);
    let score = hamming_expectation(&t1, &t2, 0).unwrap();
    assert!(score.valid);
    assert_eq!(score.value, 0.0);
}

#[test]
fn uncertain_bits_pull_expectation_toward_half() {
    // confidence 1 -> p close to 0.5 on both sides -> expectation near 0.5.
    let t1 = template(&[1, 0, 1, 0], &[1; 4], 4);
    let t2 = template(&[1, 0, 0, 1], &[1; 4], 4);
    let score = hamming_expectation(&t1, &t2, 0).unwrap();
    assert!(score.valid);
    assert!((score.value - 0.5).abs() < 0.01);
}

#[test]
fn shape_mismatch_is_a_hard_error() {
    let t1 = template(&[1, 0, 1, 0], &[255; 4], 4);
    let t2 = template(&[1, 0, 1, 0, 1, 0], &[255; 6], 6);
    assert!(hamming(&packed(&t1, 1), &packed(&t2, 1)).is_err());
    assert!(hamming_expectation(&t1, &t2, 0).is_err());
}

#[test]
fn hamming_is_shift_invariant() {
    let code1: Vec<u8> = (0..24).map(|i| u8::from((i * 7) % 5 < 2)).collect();
    let code2: Vec<u8> = (0..24).map(|i| u8::from((i * 11) % 7 < 3)).collect();
    let t1 = template(&code1, &[255; 24], 12);
    let t2 = template(&code2, &[255; 24], 12);
    let (b1, b2) = (packed(&t1, 1), packed(&t2, 1));

    for theta in -12i32..12 {
        for k in [-3i32, 1, 5] {
            let mut rot_b2_theta = b2.clone();
            b2.rotate_into(theta, &mut rot_b2_theta).unwrap();
            let lhs = hamming(&b1, &rot_b2_theta).unwrap().value;

            let mut rot_b1_k = b1.clone();
            b1.rotate_into(k, &mut rot_b1_k).unwrap();
            let mut rot_b2_tk = b2.clone();
            b2.rotate_into(theta + k, &mut rot_b2_tk).unwrap();
            let rhs = hamming(&rot_b1_k, &rot_b2_tk).unwrap().value;

            assert_eq!(lhs, rhs, "theta {theta} k {k}");
        }
    }
}
