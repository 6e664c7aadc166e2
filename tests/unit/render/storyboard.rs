use super::*;
use crate::assets::store::{AssetStore, BACKGROUND_PLACEHOLDER};
use crate::config::PipelineConfig;
use crate::foundation::warnings::WarningLog;
use crate::layout::positions::LocationCatalog;
use crate::script::cast::CharacterCatalog;
use crate::script::model::Script;

fn script(scenes: usize) -> Script {
    let scenes: Vec<_> = (0..scenes)
        .map(|_| serde_json::json!({"background": "void", "duration_seconds": 1.0}))
        .collect();
    Script::from_json_str(&serde_json::json!({"episode_id": "SB", "scenes": scenes}).to_string())
        .unwrap()
}

fn render(n: usize) -> image::RgbaImage {
    let dir = tempfile::tempdir().unwrap();
    let store = AssetStore::new(dir.path(), WarningLog::new());
    let s = script(n);
    let cfg = PipelineConfig::default();
    let inputs = RenderInputs {
        script: &s,
        assets: &store,
        cast: &CharacterCatalog::default(),
        locations: &LocationCatalog::default(),
        config: &cfg,
    };
    let mut format = RenderFormat::vertical();
    format.width = 40;
    format.height = 80;
    format.text_box.width = 40;
    format.text_box.height = 10;
    format.text_box.y = 60;
    render_storyboard(inputs, &format).unwrap()
}

#[test]
fn grid_has_three_columns() {
    let sheet = render(4);
    // 3 columns of 10px thumbs, 2 rows of 20px thumbs, 8px gaps.
    assert_eq!(sheet.dimensions(), (3 * 10 + 4 * 8, 2 * 20 + 3 * 8));
    let bg = BACKGROUND_PLACEHOLDER;
    assert_eq!(sheet.get_pixel(8, 8).0, [bg.r, bg.g, bg.b, 255]);
    // Fourth scene starts the second row.
    assert_eq!(sheet.get_pixel(8, 8 + 20 + 8).0, [bg.r, bg.g, bg.b, 255]);
}

#[test]
fn single_scene_sheet_is_one_cell() {
    let sheet = render(1);
    assert_eq!(sheet.dimensions(), (10 + 16, 20 + 16));
}
