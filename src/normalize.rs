//! Flattening of the ISAPI channel document into one CSV row per camera.

use chrono::NaiveDateTime;
use log::warn;
use serde::Serialize;
use serde_json::{Map, Value};

const DEFAULT_ID:      &str = "unknown";
const DEFAULT_NAME:    &str = "Unnamed Camera";
const DEFAULT_ENABLED: &str = "true";
const DEFAULT_VIDEO:   &str = "unknown";

/// One output row. Column names match the CSV header.
///
/// Scalar JSON values that are not strings (ids, booleans) keep their JSON
/// text, e.g. `101` or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraRecord {
    #[serde(rename = "Branch")]
    pub branch:       String,
    #[serde(rename = "CameraID")]
    pub camera_id:    String,
    #[serde(rename = "CameraName")]
    pub camera_name:  String,
    #[serde(rename = "Enabled")]
    pub enabled:      String,
    #[serde(rename = "Codec")]
    pub codec:        String,
    #[serde(rename = "Resolution")]
    pub resolution:   String,
    #[serde(rename = "LastChecked")]
    pub last_checked: String,
}

/// Render a processing time the way the `LastChecked` column expects.
pub fn timestamp(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Entries of `StreamingChannelList.StreamingChannel`.
///
/// Missing keys give an empty list. A lone object (single-channel devices)
/// counts as a one-element list.
pub fn channel_list(raw: &Value) -> Vec<&Value> {
    match raw
        .get("StreamingChannelList")
        .and_then(|list| list.get("StreamingChannel"))
    {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

/// Text of `obj[key]`, or `default` when absent or null.
fn field_text(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// German device names: a name starting with "kamera" (any case) has its
/// first literal `Kamera` replaced by `Camera`. A lowercase `kamera` prefix
/// passes the check but is left as is.
pub fn localize_name(name: &str) -> String {
    if name.to_lowercase().starts_with("kamera") {
        name.replacen("Kamera", "Camera", 1)
    } else {
        name.to_string()
    }
}

/// Map one channel object to a record, applying the per-field defaults.
pub fn map_channel(channel: &Map<String, Value>, branch: &str, checked_at: &str) -> CameraRecord {
    let empty = Map::new();
    let video = match channel.get("video") {
        Some(Value::Object(v)) => v,
        _ => &empty,
    };

    let name = field_text(channel, "channelName", DEFAULT_NAME);

    CameraRecord {
        branch:       branch.to_string(),
        camera_id:    field_text(channel, "id", DEFAULT_ID),
        camera_name:  localize_name(name.trim()),
        enabled:      field_text(channel, "enabled", DEFAULT_ENABLED),
        codec:        field_text(video, "videoCodecType", DEFAULT_VIDEO),
        resolution:   field_text(video, "videoResolution", DEFAULT_VIDEO),
        last_checked: checked_at.to_string(),
    }
}

/// Turn a device's raw channel document into records for `branch`.
///
/// Entries that are not JSON objects are skipped with a warning.
pub fn normalize_channels(raw: &Value, branch: &str, checked_at: &NaiveDateTime) -> Vec<CameraRecord> {
    let checked_at = timestamp(checked_at);
    channel_list(raw)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match entry {
            Value::Object(channel) => Some(map_channel(channel, branch, &checked_at)),
            other => {
                warn!("{branch}: skipping channel entry #{idx}, not an object: {other}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(9, 30, 15, 42)
            .unwrap()
    }

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn bare_channel_gets_defaults() {
        let rec = map_channel(&Map::new(), "Berlin", "t");
        assert_eq!(rec.branch, "Berlin");
        assert_eq!(rec.camera_id, "unknown");
        assert_eq!(rec.camera_name, "Unnamed Camera");
        assert_eq!(rec.enabled, "true");
        assert_eq!(rec.codec, "unknown");
        assert_eq!(rec.resolution, "unknown");
        assert_eq!(rec.last_checked, "t");
    }

    #[test]
    fn populated_channel() {
        let ch = obj(json!({
            "id": 101,
            "channelName": "  Entrance  ",
            "enabled": false,
            "video": { "videoCodecType": "H.265", "videoResolution": "2560*1440" }
        }));
        let rec = map_channel(&ch, "Berlin", "t");
        assert_eq!(rec.camera_id, "101");
        assert_eq!(rec.camera_name, "Entrance");
        assert_eq!(rec.enabled, "false");
        assert_eq!(rec.codec, "H.265");
        assert_eq!(rec.resolution, "2560*1440");
    }

    #[test]
    fn null_and_malformed_video_use_defaults() {
        let ch = obj(json!({ "id": null, "video": "H.264" }));
        let rec = map_channel(&ch, "B", "t");
        assert_eq!(rec.camera_id, "unknown");
        assert_eq!(rec.codec, "unknown");
        assert_eq!(rec.resolution, "unknown");
    }

    #[test]
    fn kamera_prefix_translated() {
        assert_eq!(localize_name("Kamera Eingang"), "Camera Eingang");
        assert_eq!(localize_name("KAMERA Hof"), "KAMERA Hof");
        assert_eq!(localize_name("Kamera Kamera"), "Camera Kamera");
        assert_eq!(localize_name("Hof Kamera"), "Hof Kamera");
    }

    #[test]
    fn lowercase_kamera_left_alone() {
        assert_eq!(localize_name("kamera 2"), "kamera 2");
        // prefix check passes, replacement hits the later literal
        assert_eq!(localize_name("kamera Kamera"), "kamera Camera");
    }

    #[test]
    fn name_trimmed_before_translation() {
        let ch = obj(json!({ "channelName": "  Kamera Lager " }));
        assert_eq!(map_channel(&ch, "B", "t").camera_name, "Camera Lager");
    }

    #[test]
    fn one_record_per_channel() {
        let raw = json!({
            "StreamingChannelList": {
                "StreamingChannel": [ { "id": "101" }, { "id": "201" }, {} ]
            }
        });
        let recs = normalize_channels(&raw, "Hamburg", &at());
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[1].camera_id, "201");
        assert!(recs.iter().all(|r| r.branch == "Hamburg"));
        assert!(recs.iter().all(|r| r.last_checked == "2024-03-01T09:30:15.000042"));
    }

    #[test]
    fn missing_keys_yield_nothing() {
        assert!(normalize_channels(&json!({}), "B", &at()).is_empty());
        assert!(normalize_channels(&json!({ "StreamingChannelList": {} }), "B", &at()).is_empty());
        assert!(normalize_channels(&json!([1, 2]), "B", &at()).is_empty());
    }

    #[test]
    fn single_object_channel_list() {
        let raw = json!({
            "StreamingChannelList": { "StreamingChannel": { "id": "101" } }
        });
        let recs = normalize_channels(&raw, "B", &at());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].camera_id, "101");
    }

    #[test]
    fn non_object_entries_skipped() {
        let raw = json!({
            "StreamingChannelList": { "StreamingChannel": [ "bogus", { "id": "1" }, 7 ] }
        });
        let recs = normalize_channels(&raw, "B", &at());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].camera_id, "1");
    }
}
