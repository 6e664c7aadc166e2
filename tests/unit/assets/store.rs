use std::io::Cursor;

use super::*;

fn write_png(path: &Path, w: u32, h: u32, rgba: [u8; 4]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

fn write_wav(path: &Path, frames: usize) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut buf, spec).unwrap();
        for i in 0..frames {
            w.write_sample(((i % 64) as i16 - 32) * 100).unwrap();
        }
        w.finalize().unwrap();
    }
    std::fs::write(path, buf.into_inner()).unwrap();
}

fn small_format() -> RenderFormat {
    let mut f = RenderFormat::vertical();
    f.width = 8;
    f.height = 16;
    f
}

#[test]
fn parallax_directory_wins_and_layers_scale_to_frame() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_png(&root.join("backgrounds/diner/background.png"), 2, 2, [255, 0, 0, 255]);
    write_png(&root.join("backgrounds/diner/foreground.png"), 4, 4, [0, 255, 0, 128]);
    write_png(&root.join("backgrounds/diner.png"), 2, 2, [0, 0, 255, 255]);

    let log = WarningLog::new();
    let store = AssetStore::new(root, log.clone());
    let bg = store.load_background("diner", &small_format());
    assert_eq!(bg.source, BackgroundSource::Parallax);
    assert_eq!(bg.layers.len(), 2);
    assert_eq!(bg.layers[0].coefficient, 0.2);
    assert_eq!(bg.layers[1].coefficient, 0.8);
    assert_eq!((bg.layers[1].raster.width, bg.layers[1].raster.height), (8, 16));
    assert!(log.is_empty());
}

#[test]
fn single_file_is_the_second_choice() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("backgrounds/park.png"), 2, 2, [0, 0, 255, 255]);
    let log = WarningLog::new();
    let store = AssetStore::new(dir.path(), log.clone());
    let bg = store.load_background("park", &small_format());
    assert_eq!(bg.source, BackgroundSource::Single);
    assert_eq!(bg.layers[0].raster.pixel(7, 15), [0, 0, 255, 255]);
    assert!(log.is_empty());
}

#[test]
fn missing_background_degrades_to_placeholder_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let log = WarningLog::new();
    let store = AssetStore::new(dir.path(), log.clone());
    let bg = store.load_background("nowhere", &small_format());
    assert_eq!(bg.source, BackgroundSource::Placeholder);
    assert_eq!(
        bg.layers[0].raster.pixel(0, 0),
        BACKGROUND_PLACEHOLDER.to_premul()
    );
    // Second lookup does not duplicate the warning.
    store.load_background("nowhere", &small_format());
    let w = log.snapshot();
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].asset_kind, AssetKind::Background);
    assert_eq!(w[0].identifier, "nowhere");
}

#[test]
fn sprite_falls_back_to_idle_then_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("characters/pens/idle.png"), 3, 5, [1, 2, 3, 255]);
    let log = WarningLog::new();
    let store = AssetStore::new(dir.path(), log.clone());

    let talking = store.load_sprite("pens", "talking");
    assert_eq!((talking.width, talking.height), (3, 5));
    assert!(log.is_empty());

    let ghost = store.load_sprite("ghost", "idle");
    assert_eq!((ghost.width, ghost.height), SPRITE_PLACEHOLDER_SIZE);
    let w = log.snapshot();
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].asset_kind, AssetKind::Sprite);
    assert_eq!(w[0].identifier, "ghost");
}

#[test]
fn path_traversal_identifiers_are_treated_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let log = WarningLog::new();
    let store = AssetStore::new(dir.path(), log.clone());
    let bg = store.load_background("../etc", &small_format());
    assert_eq!(bg.source, BackgroundSource::Placeholder);
    assert!(store.load_sfx("../x").is_none());
    assert_eq!(log.len(), 2);
}

#[test]
fn sounds_resolve_with_implicit_extension() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("sfx/door.wav"), 100);
    write_wav(&dir.path().join("music/main_theme.wav"), 800);
    let log = WarningLog::new();
    let store = AssetStore::new(dir.path(), log.clone());

    assert_eq!(store.load_sfx("door").unwrap().frames(), 100);
    assert_eq!(store.load_sfx("door.wav").unwrap().frames(), 100);
    assert_eq!(store.load_music("main_theme.wav").unwrap().frames(), 800);
    assert!(log.is_empty());

    assert!(store.load_music("tense_theme.wav").is_none());
    assert!(store.load_music("tense_theme.wav").is_none());
    let w = log.snapshot();
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].asset_kind, AssetKind::Music);
    assert_eq!(w[0].identifier, "tense_theme.wav");
}

#[test]
fn missing_assets_lists_without_logging() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_png(&root.join("backgrounds/diner.png"), 2, 2, [0, 0, 0, 255]);
    write_png(&root.join("characters/pens/idle.png"), 2, 2, [0, 0, 0, 255]);
    write_wav(&root.join("sfx/text_blip_mid.wav"), 10);

    let script = Script::from_json_str(
        &serde_json::json!({
            "episode_id": "ep",
            "scenes": [{
                "background": "diner",
                "duration_seconds": 4.0,
                "characters_present": ["pens", "ghost"],
                "character_positions": {"pens": "stool_1", "ghost": "stool_2"},
                "dialogue": [{"character": "pens", "text": "Hi."}],
                "sfx_triggers": [{"sfx": "door", "time_ms": 100}]
            }]
        })
        .to_string(),
    )
    .unwrap();

    let log = WarningLog::new();
    let store = AssetStore::new(root, log.clone());
    let cfg = PipelineConfig::default();
    let missing = store.missing_assets(&script, &CharacterCatalog::default(), &cfg);
    let ids: Vec<(AssetKind, &str)> = missing
        .iter()
        .map(|m| (m.kind, m.identifier.as_str()))
        .collect();
    assert!(ids.contains(&(AssetKind::Sprite, "ghost")));
    assert!(ids.contains(&(AssetKind::Sfx, "door")));
    assert!(ids.contains(&(AssetKind::Music, "main_theme.wav")));
    assert!(!ids.iter().any(|(_, id)| *id == "pens" || *id == "diner"));
    assert!(log.is_empty());
}
