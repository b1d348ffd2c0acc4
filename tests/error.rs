//! Tests for the error taxonomy

use gatefind::error::{GateDiscoveryError, OptionExt};

#[test]
fn test_missing_event_display_names_the_event() {
    let err = GateDiscoveryError::MissingEvent {
        event_id: "festival".to_string(),
    };
    let message = err.to_string();
    assert!(message.contains("festival"), "message was: {message}");
}

#[test]
fn test_computation_display_carries_context() {
    let err = GateDiscoveryError::computation("degenerate centroid over 0 samples");
    assert!(err.to_string().contains("degenerate centroid"));
    assert!(matches!(err, GateDiscoveryError::Computation { .. }));
}

#[test]
fn test_pass_in_progress_display() {
    let err = GateDiscoveryError::PassInProgress {
        event_id: "festival".to_string(),
    };
    let message = err.to_string();
    assert!(message.contains("festival"));
    assert!(message.contains("in progress"));
}

#[test]
fn test_option_ext_converts_none() {
    let missing: Option<f64> = None;
    let err = missing.ok_or_computation("empty cluster").unwrap_err();
    match err {
        GateDiscoveryError::Computation { context } => assert_eq!(context, "empty cluster"),
        other => panic!("unexpected error: {other:?}"),
    }

    let present = Some(1.5).ok_or_computation("unused");
    assert_eq!(present.unwrap(), 1.5);
}

#[test]
fn test_errors_implement_std_error() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    assert_error(&GateDiscoveryError::computation("x"));
}
