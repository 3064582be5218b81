use std::collections::HashSet;

use serde_json::{Value, json};
use tvedge::server::dtos::channel_dto::Channel;
use tvedge::server::services::schedule_services::{
    entry_id, filter_schedule, iter_channel_entries,
};

fn channel(id: &str, name: &str) -> Channel {
    Channel {
        id: id.to_string(),
        name: name.to_string(),
        tags: Vec::new(),
        logo: String::new(),
    }
}

fn enabled(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn test_walks_both_channel_list_shapes() {
    let as_array = json!([
        {"channel_id": "1", "channel_name": "One"},
        {"channel_id": "2", "channel_name": "Two"},
    ]);
    let as_map = json!({
        "1": {"channel_id": "1", "channel_name": "One"},
        "2": {"channel_id": "2", "channel_name": "Two"},
    });

    assert_eq!(iter_channel_entries(Some(&as_array)).len(), 2);
    assert_eq!(iter_channel_entries(Some(&as_map)).len(), 2);
    assert!(iter_channel_entries(Some(&json!("bogus"))).is_empty());
    assert!(iter_channel_entries(None).is_empty());
}

#[test]
fn test_numeric_channel_ids_are_accepted() {
    let list = json!([{"channel_id": 325, "channel_name": "ESPN USA"}]);
    let entries = iter_channel_entries(Some(&list));
    assert_eq!(entry_id(entries[0]), "325");
}

#[test]
fn test_drops_events_with_no_enabled_channel() {
    let schedule = json!({
        "Monday": {
            "Soccer": [
                {
                    "event": "Derby",
                    "channels": [{"channel_id": "1", "channel_name": "One"}],
                },
                {
                    "event": "Friendly",
                    "channels": [{"channel_id": "2", "channel_name": "Two"}],
                },
            ],
        },
    });
    let channels = vec![channel("1", "One"), channel("2", "Two")];

    let filtered = filter_schedule(&schedule, &channels, &enabled(&["1"]));

    let events = &filtered["Monday"]["Soccer"];
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["event"], "Derby");
}

#[test]
fn test_empty_categories_and_days_disappear() {
    let schedule = json!({
        "Monday": {
            "Soccer": [
                {"event": "Friendly", "channels": [{"channel_id": "2", "channel_name": "Two"}]},
            ],
        },
        "Tuesday": {
            "Tennis": [
                {"event": "Open", "channels": [{"channel_id": "1", "channel_name": "One"}]},
            ],
        },
    });
    let channels = vec![channel("1", "One"), channel("2", "Two")];

    let filtered = filter_schedule(&schedule, &channels, &enabled(&["1"]));

    assert!(filtered.get("Monday").is_none());
    assert!(filtered.get("Tuesday").is_some());
}

#[test]
fn test_mixed_event_keeps_only_enabled_channels() {
    let schedule = json!({
        "Monday": {
            "Soccer": [{
                "event": "Final",
                "channels": [
                    {"channel_id": "1", "channel_name": "One"},
                    {"channel_id": "2", "channel_name": "Two"},
                ],
                "channels2": [
                    {"channel_id": "3", "channel_name": "Three"},
                ],
            }],
        },
    });
    let channels = vec![channel("1", "One"), channel("2", "Two"), channel("3", "Three")];

    let filtered = filter_schedule(&schedule, &channels, &enabled(&["1"]));

    let event = &filtered["Monday"]["Soccer"][0];
    assert_eq!(event["channels"].as_array().unwrap().len(), 1);
    assert_eq!(event["channels"][0]["channel_id"], "1");
    // channels2 emptied out so the key is gone entirely
    assert!(event.get("channels2").is_none());
}

#[test]
fn test_stale_channel_id_is_repaired_from_name() {
    // the schedule still references the channel by its old id, the directory
    // knows it as 42 under the same name
    let schedule = json!({
        "Monday": {
            "Soccer": [{
                "event": "Derby",
                "channels": [{"channel_id": "999", "channel_name": "Sky Sports F1"}],
            }],
        },
    });
    let channels = vec![channel("42", "Sky Sports F1")];

    let filtered = filter_schedule(&schedule, &channels, &enabled(&["42"]));

    let entry = &filtered["Monday"]["Soccer"][0]["channels"][0];
    assert_eq!(entry["channel_id"], "42");
    assert_eq!(entry["channel_name"], "Sky Sports F1");
}

#[test]
fn test_name_matching_ignores_punctuation_and_case() {
    let schedule = json!({
        "Monday": {
            "Soccer": [{
                "event": "Derby",
                "channels": [{"channel_id": "999", "channel_name": "sky sports: f1!"}],
            }],
        },
    });
    let channels = vec![channel("42", "Sky Sports F1")];

    let filtered = filter_schedule(&schedule, &channels, &enabled(&["42"]));
    assert_eq!(
        filtered["Monday"]["Soccer"][0]["channels"][0]["channel_id"],
        "42"
    );
}

#[test]
fn test_unknown_channel_entries_are_dropped() {
    let schedule = json!({
        "Monday": {
            "Soccer": [{
                "event": "Derby",
                "channels": [{"channel_id": "999", "channel_name": "Nobody Knows TV"}],
            }],
        },
    });
    let channels = vec![channel("1", "One")];

    let filtered = filter_schedule(&schedule, &channels, &enabled(&["1"]));
    assert_eq!(filtered, Value::Object(serde_json::Map::new()));
}

#[test]
fn test_non_object_schedule_filters_to_empty() {
    let channels = vec![channel("1", "One")];
    let filtered = filter_schedule(&json!([1, 2, 3]), &channels, &enabled(&["1"]));
    assert_eq!(filtered, json!({}));
}
