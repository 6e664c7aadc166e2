use super::*;

#[test]
fn presets_are_valid() {
    let h = RenderFormat::horizontal();
    let v = RenderFormat::vertical();
    h.validate().unwrap();
    v.validate().unwrap();
    assert_eq!((h.width, h.height), (1920, 1080));
    assert_eq!((v.width, v.height), (1080, 1920));
    assert_eq!(h.parallax, vec![0.2, 0.5, 0.8, 0.9]);
    assert_eq!(h.text_box_x(), 360);
    assert_eq!(v.text_box_x(), 90);
}

#[test]
fn odd_dimensions_are_rejected() {
    let mut f = RenderFormat::vertical();
    f.width = 1081;
    assert!(f.validate().is_err());
}

#[test]
fn text_box_must_fit() {
    let mut f = RenderFormat::horizontal();
    f.text_box.y = 1000;
    assert!(f.validate().is_err());
}

#[test]
fn arbitrary_presets_deserialize_with_defaults() {
    let f: RenderFormat = serde_json::from_str(
        r#"{"name":"square","width":1080,"height":1080,"text_box":{"width":900,"height":180,"y":860}}"#,
    )
    .unwrap();
    f.validate().unwrap();
    assert_eq!(f.sprite_scale, 1);
    assert_eq!(f.parallax.len(), 4);
}
