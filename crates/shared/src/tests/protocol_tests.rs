use super::*;

#[test]
fn target_names_match_case_insensitively() {
    assert_eq!(
        HubTarget::from_name("RobotSay"),
        Some(HubTarget::RobotSay)
    );
    assert_eq!(
        HubTarget::from_name("REGIONBITRATEUPDATE"),
        Some(HubTarget::RegionBitrateUpdate)
    );
    assert_eq!(HubTarget::from_name("unknownEvent"), None);
}

#[test]
fn every_target_round_trips_through_its_name() {
    for target in HubTarget::ALL {
        assert_eq!(HubTarget::from_name(target.as_str()), Some(target));
    }
}

#[test]
fn splits_batched_frames_and_skips_empty_tail() {
    let text = format!(
        "{}{}",
        HubMessage::Ping.to_frame(),
        HubMessage::invocation("temperatureUpdate", vec![json!({"temperature": "21"})]).to_frame()
    );

    let parsed = frames(&text)
        .map(HubMessage::parse)
        .collect::<Result<Vec<_>, _>>()
        .expect("parse frames");

    assert_eq!(
        parsed,
        vec![
            HubMessage::Ping,
            HubMessage::Invocation {
                target: "temperatureUpdate".into(),
                arguments: vec![json!({"temperature": "21"})],
            },
        ]
    );
}

#[test]
fn close_without_allow_reconnect_defaults_to_false() {
    let message = HubMessage::parse(r#"{"type":7,"error":"server shutting down"}"#).expect("parse");
    assert_eq!(
        message,
        HubMessage::Close {
            error: Some("server shutting down".into()),
            allow_reconnect: false,
        }
    );
}

#[test]
fn unhandled_message_types_are_kept_as_other() {
    let message = HubMessage::parse(r#"{"type":3,"invocationId":"1","result":null}"#).expect("parse");
    assert_eq!(message, HubMessage::Other(3));
}

#[test]
fn handshake_request_is_json_protocol_v1() {
    let frame = encode_frame(&HandshakeRequest::default()).expect("encode");
    assert_eq!(frame, "{\"protocol\":\"json\",\"version\":1}\u{1e}");
}

#[test]
fn snapshot_accepts_both_key_spellings() {
    let pascal: SnapshotResponse =
        serde_json::from_value(json!({"ChanellInfo": [], "TemperatureInfo": {"temperature": "20"}}))
            .expect("pascal");
    let camel: SnapshotResponse =
        serde_json::from_value(json!({"chanellInfo": [], "temperatureInfo": {"temperature": "20"}}))
            .expect("camel");

    assert_eq!(pascal.chanell_info, camel.chanell_info);
    assert_eq!(pascal.temperature_info, camel.temperature_info);
    assert!(pascal.satellite_view.is_null());
}
