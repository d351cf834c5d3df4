//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Video Models
// ============================================================================

/// Final counters for a video (`videos`)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DbVideo {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub video_created_at: Option<DateTime<Utc>>,
    pub views_count: i32,
    pub likes_count: i32,
    pub comments_count: i32,
    pub reports_count: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Hourly measurement of a video's counters (`video_snapshots`)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DbVideoSnapshot {
    pub id: Uuid,
    pub video_id: Uuid,
    pub views_count: i32,
    pub likes_count: i32,
    pub comments_count: i32,
    pub reports_count: i32,
    pub delta_views_count: i32,
    pub delta_likes_count: i32,
    pub delta_comments_count: i32,
    pub delta_reports_count: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
