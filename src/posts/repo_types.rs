use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Post record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Post {
    pub uuid: Uuid,
    pub title: String,
    pub slug: String,
    pub content_markdown: String,
    pub content_html: String, // derived from content_markdown on every write
    pub published_at: Option<OffsetDateTime>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}
