use super::*;
use crate::script::model::Scene;

fn script(durations: &[f64]) -> Script {
    Script {
        episode_id: "EP002".to_string(),
        title: "Pacing".to_string(),
        mood: Some("mystery".to_string()),
        target_duration_seconds: None,
        scenes: durations
            .iter()
            .map(|d| Scene {
                background: "diner".to_string(),
                duration_seconds: Some(*d),
                ..Scene::default()
            })
            .collect(),
        end_card: Default::default(),
    }
}

#[test]
fn upbeat_scales_floors_and_extends_last_scene() {
    let s = script(&[10.0, 4.0, 8.0]);
    let out = s.with_pacing(&PacingVariant::upbeat());
    let d: Vec<f64> = out
        .scenes
        .iter()
        .map(|s| s.duration_seconds.unwrap())
        .collect();
    assert!((d[0] - 8.5).abs() < 1e-9);
    assert_eq!(d[1], MIN_SCENE_SECONDS);
    assert!((d[2] - (6.8 + 1.0)).abs() < 1e-9);
    assert!(out.scenes.iter().all(|s| s.music.as_deref() == Some("upbeat_theme.wav")));
}

#[test]
fn source_script_is_not_mutated() {
    let s = script(&[10.0]);
    let before = s.clone();
    let _ = s.with_pacing(&PacingVariant::tense());
    assert_eq!(s, before);
}

#[test]
fn standard_keeps_music_and_adds_hold() {
    let s = script(&[6.0, 6.0]);
    let out = s.with_pacing(&PacingVariant::standard());
    assert_eq!(out.scenes[0].duration_seconds, Some(6.0));
    assert_eq!(out.scenes[1].duration_seconds, Some(8.0));
    assert!(out.scenes.iter().all(|s| s.music.is_none()));
}

#[test]
fn presets_are_looked_up_by_name() {
    assert_eq!(PacingVariant::by_name("tense").unwrap().pacing_multiplier, 1.15);
    assert!(PacingVariant::by_name("glacial").is_none());
}
