use super::*;

fn probe() -> MediaProbe {
    MediaProbe {
        width: 1080,
        height: 1920,
        duration_secs: 5.3,
        has_audio: true,
        size_bytes: 800 * 1024,
    }
}

fn formats() -> Vec<RenderFormat> {
    vec![RenderFormat::horizontal(), RenderFormat::vertical()]
}

#[test]
fn well_formed_output_passes() {
    let v = evaluate_gate(&probe(), &formats(), 5.27, &QualityConfig::default());
    assert!(v.passed, "{:?}", v.issues);
    assert!(v.issues.is_empty());
}

#[test]
fn duration_band_is_fifteen_percent() {
    let q = QualityConfig::default();
    let mut p = probe();
    p.duration_secs = 11.4;
    assert!(evaluate_gate(&p, &formats(), 10.0, &q).passed);
    p.duration_secs = 11.6;
    let v = evaluate_gate(&p, &formats(), 10.0, &q);
    assert!(!v.passed);
    assert_eq!(v.issues.len(), 1);
    assert!(v.issues[0].starts_with("duration"));
    p.duration_secs = 8.4;
    assert!(!evaluate_gate(&p, &formats(), 10.0, &q).passed);
}

#[test]
fn every_violation_is_reported() {
    let p = MediaProbe {
        width: 720,
        height: 720,
        duration_secs: 5.3,
        has_audio: false,
        size_bytes: 10,
    };
    let v = evaluate_gate(&p, &formats(), 5.3, &QualityConfig::default());
    assert!(!v.passed);
    assert_eq!(v.issues.len(), 3);
    assert!(v.issues.iter().any(|i| i.contains("720x720")));
    assert!(v.issues.iter().any(|i| i.contains("below minimum")));
    assert!(v.issues.iter().any(|i| i == "no audio stream"));
}

#[test]
fn absolute_bounds_apply_on_top_of_the_band() {
    let q = QualityConfig {
        max_duration_seconds: Some(5.0),
        max_file_bytes: 1024 * 1024,
        ..QualityConfig::default()
    };
    let v = evaluate_gate(&probe(), &formats(), 5.3, &q);
    assert_eq!(v.issues.len(), 1);
    assert!(v.issues[0].contains("above maximum 5.00s"));
}
