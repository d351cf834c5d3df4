//! Bulk import of the video dataset from JSON
//!
//! Accepted shapes:
//!
//! ```json
//! [ { "id": "...", "creator_id": "...", ..., "snapshots": [ { ... } ] } ]
//! { "videos": [ ... ] }
//! ```
//!
//! Field coercion is lenient: counters accept numbers, booleans and numeric
//! strings (anything else reads as 0), timestamps accept ISO-8601 with or
//! without an offset (anything else reads as NULL). Records whose ids are not
//! UUIDs are skipped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::{DbError, DbResult, DbVideo, DbVideoSnapshot};

/// Videos and snapshots parsed from one input document
#[derive(Debug, Default)]
pub struct Dataset {
    pub videos: Vec<DbVideo>,
    pub snapshots: Vec<DbVideoSnapshot>,
    /// Video or snapshot records dropped because of unusable ids
    pub skipped: usize,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Parse raw file contents. Malformed JSON is a `Serialization` error.
    pub fn from_slice(bytes: &[u8]) -> DbResult<Self> {
        let document: Value = serde_json::from_slice(bytes)?;
        Self::from_json(&document)
    }

    /// Parse a JSON document in either accepted shape.
    pub fn from_json(document: &Value) -> DbResult<Self> {
        let records = match document {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("videos") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(DbError::InvalidInput(
                        "expected JSON array of videos (or object with key 'videos')".to_string(),
                    ))
                }
            },
            _ => {
                return Err(DbError::InvalidInput(
                    "expected JSON array of videos (or object with key 'videos')".to_string(),
                ))
            }
        };

        let mut dataset = Dataset::default();

        for record in records {
            let Value::Object(video) = record else {
                continue;
            };

            let (Some(id), Some(creator_id)) =
                (parse_uuid(video.get("id")), parse_uuid(video.get("creator_id")))
            else {
                warn!(id = ?video.get("id"), "Skipping video with invalid id or creator_id");
                dataset.skipped += 1;
                continue;
            };

            dataset.videos.push(DbVideo {
                id,
                creator_id,
                video_created_at: parse_dt(video.get("video_created_at")),
                views_count: to_int(video.get("views_count")),
                likes_count: to_int(video.get("likes_count")),
                comments_count: to_int(video.get("comments_count")),
                reports_count: to_int(video.get("reports_count")),
                created_at: parse_dt(video.get("created_at")),
                updated_at: parse_dt(video.get("updated_at")),
            });

            let Some(Value::Array(snapshots)) = video.get("snapshots") else {
                continue;
            };

            for snap in snapshots {
                let Value::Object(snap) = snap else {
                    continue;
                };
                let Some(snap_id) = parse_uuid(snap.get("id")) else {
                    warn!(video_id = %id, "Skipping snapshot with invalid id");
                    dataset.skipped += 1;
                    continue;
                };

                dataset.snapshots.push(DbVideoSnapshot {
                    id: snap_id,
                    video_id: id,
                    views_count: to_int(snap.get("views_count")),
                    likes_count: to_int(snap.get("likes_count")),
                    comments_count: to_int(snap.get("comments_count")),
                    reports_count: to_int(snap.get("reports_count")),
                    delta_views_count: to_int(snap.get("delta_views_count")),
                    delta_likes_count: to_int(snap.get("delta_likes_count")),
                    delta_comments_count: to_int(snap.get("delta_comments_count")),
                    delta_reports_count: to_int(snap.get("delta_reports_count")),
                    created_at: parse_dt(snap.get("created_at")),
                    updated_at: parse_dt(snap.get("updated_at")),
                });
            }
        }

        Ok(dataset)
    }
}

fn parse_uuid(value: Option<&Value>) -> Option<Uuid> {
    match value? {
        Value::String(s) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    }
}

/// Lenient integer coercion; saturates at the `INTEGER` column range.
pub fn to_int(value: Option<&Value>) -> i32 {
    let wide: i64 = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
            .unwrap_or(0),
        _ => 0,
    };
    wide.clamp(i32::MIN.into(), i32::MAX.into()) as i32
}

/// Lenient ISO-8601 timestamp parsing. Values without an offset are UTC.
pub fn parse_dt(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let Some(Value::String(s)) = value else {
        return None;
    };
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
