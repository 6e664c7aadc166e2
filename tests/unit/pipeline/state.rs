use super::*;

fn rendering(format: &str, phase: RenderPhase) -> RenderState {
    RenderState::Rendering {
        format: format.to_string(),
        phase,
    }
}

#[test]
fn happy_path_with_two_formats() {
    let mut m = StateMachine::new();
    m.advance(RenderState::AssetCheck).unwrap();
    m.advance(rendering("horizontal", RenderPhase::Composing)).unwrap();
    m.advance(rendering("horizontal", RenderPhase::Encoding)).unwrap();
    m.advance(rendering("vertical", RenderPhase::Composing)).unwrap();
    m.advance(rendering("vertical", RenderPhase::Encoding)).unwrap();
    m.advance(RenderState::QualityGate).unwrap();
    m.advance(RenderState::Done).unwrap();
    assert_eq!(m.history().len(), 8);
    assert!(m.current().is_terminal());
}

#[test]
fn illegal_transitions_are_rejected() {
    let mut m = StateMachine::new();
    assert!(m.advance(RenderState::Done).is_err());
    assert!(m.advance(RenderState::QualityGate).is_err());
    m.advance(RenderState::AssetCheck).unwrap();
    assert!(m.advance(rendering("v", RenderPhase::Encoding)).is_err());
    m.advance(rendering("v", RenderPhase::Composing)).unwrap();
    assert!(m.advance(RenderState::QualityGate).is_err());
    assert_eq!(m.current(), &rendering("v", RenderPhase::Composing));
}

#[test]
fn failed_is_reachable_and_final() {
    let mut m = StateMachine::new();
    m.advance(RenderState::AssetCheck).unwrap();
    m.fail("encoder");
    assert!(matches!(m.current(), RenderState::Failed { reason } if reason == "encoder"));
    assert!(m.advance(RenderState::Idle).is_err());
    m.fail("again");
    assert_eq!(m.history().len(), 3);
}

#[test]
fn serializes_with_a_state_tag() {
    let v = serde_json::to_value(rendering("vertical", RenderPhase::Encoding)).unwrap();
    assert_eq!(
        v,
        serde_json::json!({"state": "rendering", "format": "vertical", "phase": "encoding"})
    );
    assert_eq!(
        serde_json::to_value(RenderState::Done).unwrap(),
        serde_json::json!({"state": "done"})
    );
}
