use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::posts::repo_types::Post;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("slug '{0}' is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_uuid(&self, uuid: Uuid) -> anyhow::Result<Option<Post>>;
    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>>;
    /// Fails with [`RepoError::SlugTaken`] when another post already owns the slug.
    async fn insert(&self, post: &Post) -> Result<(), RepoError>;
    /// Rewrites title, slug and content. `published_at` is left as stored and
    /// the row is returned as written; `None` when no post has that uuid.
    async fn update_by_uuid(&self, uuid: Uuid, post: &Post) -> Result<Option<Post>, RepoError>;
    /// Touches only `published_at`.
    async fn set_published_at(
        &self,
        uuid: Uuid,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Post>>;
    async fn list(&self) -> anyhow::Result<Vec<Post>>;
    async fn list_published(&self) -> anyhow::Result<Vec<Post>>;
}

#[derive(Clone)]
pub struct PgPostRepository {
    db: PgPool,
}

impl PgPostRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn write_error(e: sqlx::Error, slug: &str, what: &'static str) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return RepoError::SlugTaken(slug.to_string());
        }
    }
    RepoError::Other(anyhow::Error::new(e).context(what))
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_uuid(&self, uuid: Uuid) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT uuid, title, slug, content_markdown, content_html, published_at
            FROM posts
            WHERE uuid = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.db)
        .await
        .context("find post by uuid")?;
        Ok(post)
    }

    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT uuid, title, slug, content_markdown, content_html, published_at
            FROM posts
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await
        .context("find post by slug")?;
        Ok(post)
    }

    async fn insert(&self, post: &Post) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO posts (uuid, title, slug, content_markdown, content_html, published_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.uuid)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content_markdown)
        .bind(&post.content_html)
        .bind(post.published_at)
        .execute(&self.db)
        .await
        .map_err(|e| write_error(e, &post.slug, "insert post"))?;
        Ok(())
    }

    async fn update_by_uuid(&self, uuid: Uuid, post: &Post) -> Result<Option<Post>, RepoError> {
        let updated = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
               SET title = $1, slug = $2, content_markdown = $3, content_html = $4
             WHERE uuid = $5
            RETURNING uuid, title, slug, content_markdown, content_html, published_at
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content_markdown)
        .bind(&post.content_html)
        .bind(uuid)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| write_error(e, &post.slug, "update post"))?;
        Ok(updated)
    }

    async fn set_published_at(
        &self,
        uuid: Uuid,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Post>> {
        let updated = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
               SET published_at = $1
             WHERE uuid = $2
            RETURNING uuid, title, slug, content_markdown, content_html, published_at
            "#,
        )
        .bind(at)
        .bind(uuid)
        .fetch_optional(&self.db)
        .await
        .context("set post published_at")?;
        Ok(updated)
    }

    async fn list(&self) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT uuid, title, slug, content_markdown, content_html, published_at
            FROM posts
            ORDER BY created_at ASC, uuid ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list posts")?;
        Ok(rows)
    }

    async fn list_published(&self) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT uuid, title, slug, content_markdown, content_html, published_at
            FROM posts
            WHERE published_at IS NOT NULL
            ORDER BY created_at ASC, uuid ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list published posts")?;
        Ok(rows)
    }
}
