// SPDX-License-Identifier: MIT

crate::define_uuid_id! {
    /// Test-only id type.
    pub struct TestId;
}

#[test]
fn round_trips_through_display_and_parse() {
    let id = TestId::new();
    let parsed = TestId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn rejects_non_uuid_strings() {
    assert!(TestId::parse("not-a-uuid").is_err());
}

#[test]
fn serializes_as_plain_uuid_string() {
    let id = TestId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn two_new_ids_differ() {
    assert_ne!(TestId::new(), TestId::new());
}
