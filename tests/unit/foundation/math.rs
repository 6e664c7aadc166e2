use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u8(255, 128), 128);
}

#[test]
fn db_conversions_are_inverse() {
    assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
    assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
    assert!((gain_to_db(db_to_gain(-6.0)) + 6.0).abs() < 1e-4);
    assert_eq!(gain_to_db(0.0), f32::NEG_INFINITY);
}

#[test]
fn premultiply_then_unpremultiply_keeps_opaque_and_clears_transparent() {
    let mut px = vec![200, 100, 50, 255, 200, 100, 50, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[200, 100, 50, 255]);
    assert_eq!(&px[4..], &[0, 0, 0, 0]);

    let mut half = vec![255, 0, 0, 128];
    premultiply_rgba8_in_place(&mut half);
    unpremultiply_rgba8_in_place(&mut half);
    assert_eq!(half, vec![255, 0, 0, 128]);
}
