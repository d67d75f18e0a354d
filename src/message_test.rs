use super::*;

// =============================================================
// Group
// =============================================================

#[test]
fn group_parses_exact_names() {
    for group in Group::ALL {
        assert_eq!(group.as_str().parse::<Group>().unwrap(), group);
    }
}

#[test]
fn group_rejects_unknown_and_wrong_case() {
    assert_eq!("general".parse::<Group>(), Err(UnknownGroup("general".into())));
    assert!("Gaming".parse::<Group>().is_err());
}

#[test]
fn group_default_is_general() {
    assert_eq!(Group::default(), Group::General);
}

// =============================================================
// Message
// =============================================================

#[test]
fn message_decodes_device_json() {
    let json = r#"[{"sender":"A","message":"hi","timestamp":"2024-01-01T00:00:00Z","group":"General"}]"#;
    let messages: Vec<Message> = serde_json::from_str(json).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, "A");
    assert_eq!(messages[0].group, "General");
}

#[test]
fn message_key_combines_timestamp_and_index() {
    let msg = Message {
        sender: "A".into(),
        message: "hi".into(),
        timestamp: "2024-01-01T00:00:00Z".into(),
        group: "General".into(),
    };
    assert_eq!(msg.key(3), "2024-01-01T00:00:00Z-3");
}

#[test]
fn stamped_outgoing_message_has_rfc3339_timestamp() {
    let out = OutgoingMessage::stamped("User-1", "hello", Group::Talks);
    let ts = out.timestamp.unwrap();
    assert!(OffsetDateTime::parse(&ts, &Rfc3339).is_ok(), "bad timestamp {ts}");
}

// =============================================================
// Time labels
// =============================================================

#[test]
fn time_label_formats_rfc3339_as_12_hour_clock() {
    assert_eq!(format_time_label("2024-01-01T00:05:00Z"), "12:05 AM");
    assert_eq!(format_time_label("2024-01-01T13:45:10Z"), "01:45 PM");
}

#[test]
fn time_label_accepts_device_local_format() {
    assert_eq!(format_time_label("2024-03-02 09:30:00"), "09:30 AM");
}

#[test]
fn time_label_rejects_garbage() {
    assert_eq!(format_time_label("yesterday"), "Invalid Time");
    assert_eq!(format_time_label(""), "Invalid Time");
}
