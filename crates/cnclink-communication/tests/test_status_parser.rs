use cnclink_communication::{StatusFrame, StatusParser};
use cnclink_core::{PositionVector, Telemetry};

#[test]
fn test_full_report() {
    let frame = StatusParser::parse("<Idle|MPos:1.000,2.000,3.000|WPos:4.000,5.000,6.000>").unwrap();

    assert_eq!(frame.machine_state.as_deref(), Some("Idle"));
    assert_eq!(frame.mpos.unwrap().coords(), &[1.0, 2.0, 3.0]);
    assert_eq!(frame.wpos.unwrap().coords(), &[4.0, 5.0, 6.0]);
}

#[test]
fn test_mpos_only_leaves_work_untouched() {
    let mut telemetry = Telemetry::new(
        PositionVector::from_coords(vec![0.0, 0.0, 0.0]),
        PositionVector::from_coords(vec![7.0, 8.0, 9.0]),
    );

    let frame = StatusParser::parse("<Run|MPos:10.5,-2.25,0|FS:500,0>").unwrap();
    assert!(frame.apply_to(&mut telemetry));

    assert_eq!(telemetry.machine.coords(), &[10.5, -2.25, 0.0]);
    assert_eq!(telemetry.work.coords(), &[7.0, 8.0, 9.0]);
}

#[test]
fn test_four_axis_report() {
    let frame = StatusParser::parse("<Idle|MPos:1,2,3,45.5|FS:0,0>").unwrap();
    let mpos = frame.mpos.unwrap();
    assert_eq!(mpos.len(), 4);
    assert_eq!(mpos.z(), Some(3.0));
}

#[test]
fn test_non_status_lines() {
    assert_eq!(StatusParser::parse("ok"), None);
    assert_eq!(StatusParser::parse("error:20"), None);
    assert_eq!(StatusParser::parse("[MSG:INFO: Connecting]"), None);
    assert_eq!(StatusParser::parse(""), None);
}

#[test]
fn test_envelope_without_positions() {
    let frame = StatusParser::parse("<Hold:0|FS:0,0|Pn:P>").unwrap();
    assert!(!frame.has_position());

    let mut telemetry = Telemetry::default();
    assert!(!frame.apply_to(&mut telemetry));
    assert_eq!(telemetry, Telemetry::default());
}

// Bad tokens are skipped rather than rejecting the field, which shifts the
// remaining axes. Kept for compatibility with the controllers' own tooling;
// revisit if a stricter parse is wanted.
#[test]
fn test_malformed_token_is_skipped() {
    let frame = StatusParser::parse("<MPos:1,x,3>").unwrap();
    assert_eq!(frame.mpos.unwrap().coords(), &[1.0, 3.0]);
}

#[test]
fn test_empty_coordinate_list_is_ignored() {
    let frame = StatusParser::parse("<Idle|MPos:|WPos:a,b>").unwrap();
    assert_eq!(frame, StatusFrame {
        machine_state: Some("Idle".to_string()),
        mpos: None,
        wpos: None,
    });
}

#[test]
fn test_last_occurrence_wins() {
    let frame = StatusParser::parse("<Idle|MPos:1,1,1|MPos:2,2,2>").unwrap();
    assert_eq!(frame.mpos.unwrap().coords(), &[2.0, 2.0, 2.0]);
}

#[test]
fn test_frame_serializes() {
    let frame = StatusParser::parse("<Idle|WPos:1,2,3>").unwrap();
    let json = serde_json::to_value(&frame).unwrap();
    assert_eq!(json["machine_state"], "Idle");
    assert_eq!(json["wpos"], serde_json::json!([1.0, 2.0, 3.0]));
    assert!(json["mpos"].is_null());
}
