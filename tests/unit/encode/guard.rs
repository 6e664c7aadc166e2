use super::*;

#[test]
fn cancel_is_shared_between_clones() {
    let token = CancelToken::new();
    let guard = RenderGuard::unbounded(token.clone());
    assert!(guard.check().is_ok());
    token.cancel();
    assert!(guard.token().is_cancelled());
    assert_eq!(guard.check().unwrap_err().kind(), crate::ErrorKind::Cancelled);
}

#[test]
fn budget_expires() {
    let guard = RenderGuard::new(CancelToken::new(), 0.001);
    std::thread::sleep(Duration::from_millis(20));
    let err = guard.check().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Timeout);
    assert!(!err.is_retryable());
}

#[test]
fn non_positive_budget_means_no_deadline() {
    assert!(RenderGuard::new(CancelToken::new(), 0.0).deadline().is_none());
    assert!(RenderGuard::new(CancelToken::new(), f64::NAN).deadline().is_none());
    assert!(RenderGuard::new(CancelToken::new(), 5.0).deadline().is_some());
}
