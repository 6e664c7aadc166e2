use super::*;
use crate::ErrorKind;

fn catalog() -> LocationCatalog {
    LocationCatalog::from_json_str(
        r#"{"locations": {
            "diner": {"character_positions": {
                "stool_1": {"x": 300, "y": 1500},
                "stool_2": {"x": 701, "y": 1333, "facing": "left"}
            }},
            "pier": {"reference": {"width": 1920, "height": 1080},
                     "character_positions": {"edge": {"x": 960, "y": 900}}}
        }}"#,
    )
    .unwrap()
}

fn format(width: u32, height: u32) -> RenderFormat {
    RenderFormat {
        name: format!("{width}x{height}"),
        width,
        height,
        ..RenderFormat::vertical()
    }
}

#[test]
fn canonical_resolution_is_identity() {
    let p = catalog()
        .resolve("diner", "stool_2", &RenderFormat::vertical())
        .unwrap();
    assert_eq!((p.x, p.y), (701, 1333));
    assert_eq!(p.facing, Facing::Left);
}

#[test]
fn doubled_format_doubles_coordinates() {
    let cat = catalog();
    for slot in ["stool_1", "stool_2"] {
        let a = cat.resolve("diner", slot, &format(1080, 1920)).unwrap();
        let b = cat.resolve("diner", slot, &format(2160, 3840)).unwrap();
        assert_eq!(b.x, a.x * 2);
        assert_eq!(b.y, a.y * 2);
    }
}

#[test]
fn fractional_coordinates_are_rejected_at_load() {
    let err = LocationCatalog::from_json_str(
        r#"{"locations": {"diner": {"character_positions": {"stool_1": {"x": 100.5, "y": 1500}}}}}"#,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Layout);
    assert!(err.to_string().contains("stool_1"));

    // Whole values written as floats are fine.
    let cat = LocationCatalog::from_json_str(
        r#"{"locations": {"diner": {"character_positions": {"stool_1": {"x": 100.0, "y": 1500}}}}}"#,
    )
    .unwrap();
    let a = cat.resolve("diner", "stool_1", &format(1080, 1920)).unwrap();
    let b = cat.resolve("diner", "stool_1", &format(2160, 3840)).unwrap();
    assert_eq!((b.x, b.y), (a.x * 2, a.y * 2));
}

#[test]
fn legacy_table_rescales_to_horizontal() {
    let p = catalog()
        .resolve("diner", "stool_1", &RenderFormat::horizontal())
        .unwrap();
    // 300 * 1920 / 1080 = 533.3; 1500 * 1080 / 1920 = 843.75
    assert_eq!((p.x, p.y), (533, 843));
}

#[test]
fn explicit_reference_is_respected() {
    let p = catalog()
        .resolve("pier", "edge", &RenderFormat::horizontal())
        .unwrap();
    assert_eq!((p.x, p.y), (960, 900));
}

#[test]
fn unknown_slot_and_location_are_layout_errors() {
    let cat = catalog();
    let err = cat
        .resolve("diner", "booth_9", &RenderFormat::vertical())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Layout);
    assert!(err.to_string().contains("booth_9"));
    assert!(err.to_string().contains("stool_1"));

    let err = cat
        .resolve("moon", "stool_1", &RenderFormat::vertical())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Layout);
}

#[test]
fn shared_slot_is_a_warning_not_an_error() {
    let scene = crate::script::model::Scene {
        background: "diner".to_string(),
        duration_seconds: Some(4.0),
        characters_present: vec!["pens".to_string(), "oinks".to_string()],
        character_positions: [
            ("pens".to_string(), "stool_1".to_string()),
            ("oinks".to_string(), "stool_1".to_string()),
        ]
        .into_iter()
        .collect(),
        ..Default::default()
    };
    let log = WarningLog::new();
    let resolved = catalog()
        .resolve_scene(&scene, &RenderFormat::vertical(), &log)
        .unwrap();
    assert_eq!(resolved.len(), 2);
    assert_eq!(log.len(), 1);
    assert_eq!(log.snapshot()[0].asset_kind, AssetKind::Slot);
}
