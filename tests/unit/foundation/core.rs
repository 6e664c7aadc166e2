use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.frame_duration_secs(), 1.0 / 30.0);
}

#[test]
fn ceil_does_not_overshoot_exact_products() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.secs_to_frames_ceil(0.5), 15);
    assert_eq!(fps.secs_to_frames_ceil(0.25), 8);
    assert_eq!(fps.secs_to_frames_ceil(2.0), 60);
    assert_eq!(fps.secs_to_frames_ceil(0.0), 0);
}

#[test]
fn floor_tolerates_representation_error() {
    let fps = Fps::new(30, 1).unwrap();
    // 0.1 * 3 = 0.30000000000000004; 0.7 * 30 = 20.999999999999996
    assert_eq!(fps.secs_to_frames_floor(0.7), 21);
    assert_eq!(fps.secs_to_frames_floor(1.0 / 30.0), 1);
}

#[test]
fn hex_colors_parse_and_roundtrip() {
    assert_eq!(Rgba8::from_hex("#ff8000").unwrap(), Rgba8::rgb(255, 128, 0));
    assert_eq!(Rgba8::from_hex("fff").unwrap(), Rgba8::WHITE);
    assert_eq!(
        Rgba8::from_hex("#1a1a3ad8").unwrap(),
        Rgba8::rgba(26, 26, 58, 216)
    );
    assert!(Rgba8::from_hex("#12345").is_err());
    assert!(Rgba8::from_hex("#zzzzzz").is_err());

    let c: Rgba8 = serde_json::from_str("\"#00ff00\"").unwrap();
    assert_eq!(c, Rgba8::rgb(0, 255, 0));
    assert_eq!(serde_json::to_string(&c).unwrap(), "\"#00ff00\"");
}

#[test]
fn premul_scales_color_by_alpha() {
    assert_eq!(Rgba8::rgba(255, 255, 255, 0).to_premul(), [0, 0, 0, 0]);
    assert_eq!(Rgba8::rgba(200, 100, 50, 255).to_premul(), [200, 100, 50, 255]);
    assert_eq!(Rgba8::rgba(255, 0, 0, 128).to_premul(), [128, 0, 0, 128]);
}
