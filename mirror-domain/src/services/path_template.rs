// Event storage path template
// Pure: the same (region, date, names) always yields the same relative path.

use crate::utils::date_parts;
use crate::value_objects::Region;

pub const EVENTS_DIR: &str = "events";
pub const STAGING_DIR: &str = "staging";
pub const CONTAINER_INDEX_FILE: &str = "tournaments.jsonl";
pub const USERS_FILE: &str = "users.jsonl";
pub const CONTAINER_LEDGER_FILE: &str = "done.csv";
pub const EVENT_LEDGER_FILE: &str = "done_events.csv";

pub fn sanitize_segment(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|ch| !ch.is_control())
        .map(|ch| match ch {
            ' ' => '_',
            '/' | '\\' => '-',
            other => other,
        })
        .collect();
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}

pub fn event_path(
    region: Region,
    year: &str,
    month: &str,
    day: &str,
    container_name: &str,
    event_name: &str,
) -> String {
    [
        EVENTS_DIR.to_string(),
        sanitize_segment(region.as_str()),
        year.to_string(),
        month.to_string(),
        day.to_string(),
        sanitize_segment(container_name),
        sanitize_segment(event_name),
    ]
    .join("/")
}

pub fn event_path_for_timestamp(
    region: Region,
    timestamp: i64,
    container_name: &str,
    event_name: &str,
) -> String {
    let (year, month, day) = date_parts(timestamp);
    event_path(region, &year, &month, &day, container_name, event_name)
}

/// Directory that groups all events of one container.
pub fn container_dir_of(event_path: &str) -> Option<&str> {
    event_path.rsplit_once('/').map(|(parent, _)| parent)
}
