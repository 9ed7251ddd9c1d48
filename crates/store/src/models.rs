//! Database models mapping to the store schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// Pickcode cache record: one provider identifier per canonical file path.
#[derive(Debug, Clone, FromRow)]
pub struct PickcodeRow {
    pub file_path: String,
    pub pickcode: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Media enrichment task record.
#[derive(Debug, Clone, FromRow)]
pub struct MediaTaskRow {
    pub task_id: i64,
    pub item_id: String,
    /// One of `pending`, `processing`, `completed`, `failed`.
    pub status: String,
    pub created_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub error_message: Option<String>,
    pub retry_count: i64,
}
