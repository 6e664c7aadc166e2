use super::*;

#[test]
fn parses_video_audio_and_duration() {
    let json = br#"{
        "streams": [
            {"codec_type": "video", "width": 1080, "height": 1920, "duration": "5.233333"},
            {"codec_type": "audio", "duration": "5.200000"}
        ],
        "format": {"duration": "5.240000", "size": "123456"}
    }"#;
    let p = parse_probe_json(json, 123_456).unwrap();
    assert_eq!((p.width, p.height), (1080, 1920));
    assert!(p.has_audio);
    assert!((p.duration_secs - 5.24).abs() < 1e-9);
    assert_eq!(p.size_bytes, 123_456);
}

#[test]
fn falls_back_to_stream_duration() {
    let json = br#"{"streams": [{"codec_type": "video", "width": 2, "height": 2, "duration": "1.5"}]}"#;
    let p = parse_probe_json(json, 10).unwrap();
    assert!(!p.has_audio);
    assert_eq!(p.duration_secs, 1.5);
}

#[test]
fn audio_only_is_an_error() {
    let json = br#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "1.0"}}"#;
    assert!(parse_probe_json(json, 1).is_err());
    assert_eq!(
        parse_probe_json(b"not json", 1).unwrap_err().kind(),
        crate::ErrorKind::Serde
    );
}
