use super::*;

#[test]
fn clones_share_entries() {
    let log = WarningLog::new();
    let other = log.clone();
    other.push(
        Component::Assets,
        AssetKind::Background,
        "diner",
        "missing background",
    );
    assert_eq!(log.len(), 1);
    assert_eq!(log.snapshot()[0].identifier, "diner");
    log.clear();
    assert!(other.is_empty());
}

#[test]
fn push_once_deduplicates_by_identifier() {
    let log = WarningLog::new();
    assert!(log.push_once(Component::Assets, AssetKind::Sprite, "pens/idle", "a"));
    assert!(!log.push_once(Component::Assets, AssetKind::Sprite, "pens/idle", "b"));
    assert!(log.push_once(Component::Assets, AssetKind::Sprite, "pens/talking", "c"));
    assert_eq!(log.len(), 2);
}

#[test]
fn concurrent_appends_are_all_kept() {
    let log = WarningLog::new();
    std::thread::scope(|s| {
        for t in 0..8 {
            let log = log.clone();
            s.spawn(move || {
                for i in 0..50 {
                    log.push(
                        Component::Audio,
                        AssetKind::Sfx,
                        format!("sfx_{t}_{i}"),
                        "missing",
                    );
                }
            });
        }
    });
    let entries = log.snapshot();
    assert_eq!(entries.len(), 400);
    assert!(entries.iter().all(|w| w.message == "missing"));
}

#[test]
fn merge_appends_other_log() {
    let a = WarningLog::new();
    let b = WarningLog::new();
    b.push(Component::Audio, AssetKind::Music, "main_theme.wav", "missing");
    a.merge(&b);
    a.merge(&a.clone());
    assert_eq!(a.len(), 1);
}
