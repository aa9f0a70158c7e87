use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    markdown,
    repo::{PostRepository, RepoError},
    repo_types::Post,
    slug::{SlugAllocator, SlugError},
};
use crate::error::AppError;

/// Whole allocate-then-write rounds attempted when a concurrent writer
/// claims the slug between the probe and the write.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post with uuid '{0}' not found")]
    NotFound(Uuid),
    #[error("post with slug '{0}' not found")]
    SlugNotFound(String),
    #[error("post with slug '{0}' is not published")]
    NotPublished(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SlugError> for PostError {
    fn from(e: SlugError) -> Self {
        match e {
            SlugError::Empty => PostError::Validation(e.to_string()),
            SlugError::Exhausted { .. } => PostError::Conflict(e.to_string()),
            SlugError::Repository(e) => PostError::Internal(e.context("error on find by slug")),
        }
    }
}

impl From<PostError> for AppError {
    fn from(e: PostError) -> Self {
        match e {
            PostError::NotFound(_) | PostError::SlugNotFound(_) => AppError::NotFound(e.to_string()),
            // Drafts look exactly like missing posts from the outside.
            PostError::NotPublished(slug) => {
                AppError::NotFound(PostError::SlugNotFound(slug).to_string())
            }
            PostError::Validation(msg) => AppError::Validation(msg),
            PostError::Conflict(msg) => AppError::Conflict(msg),
            PostError::Internal(e) => AppError::Internal(e),
        }
    }
}

/// Fields shared by the create and update operations.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    /// Explicit slug; `None` or blank means "derive from the title".
    pub slug: Option<String>,
    pub content_markdown: String,
}

impl PostDraft {
    fn slug_seed(&self) -> &str {
        match self.slug.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => &self.title,
        }
    }
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    slugs: SlugAllocator,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        let slugs = SlugAllocator::new(posts.clone());
        Self { posts, slugs }
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(&self, draft: PostDraft) -> Result<Post, PostError> {
        let mut post = Post {
            uuid: Uuid::new_v4(),
            title: draft.title.clone(),
            slug: String::new(),
            content_html: markdown::render(&draft.content_markdown),
            content_markdown: draft.content_markdown.clone(),
            published_at: None,
        };

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            post.slug = self.slugs.allocate(draft.slug_seed(), None).await?;
            match self.posts.insert(&post).await {
                Ok(()) => {
                    info!(post_uuid = %post.uuid, slug = %post.slug, "post created");
                    return Ok(post);
                }
                Err(RepoError::SlugTaken(slug)) => {
                    warn!(%slug, attempt, "slug claimed concurrently, retrying");
                }
                Err(RepoError::Other(e)) => return Err(e.context("error on insert post").into()),
            }
        }
        Err(PostError::Conflict(format!(
            "could not reserve a slug for '{}'",
            draft.title
        )))
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn update(&self, uuid: Uuid, draft: PostDraft) -> Result<Post, PostError> {
        self.get_by_uuid(uuid).await?;
        // published_at is not part of the write; the stored value comes back.
        let mut post = Post {
            uuid,
            title: draft.title.clone(),
            slug: String::new(),
            content_html: markdown::render(&draft.content_markdown),
            content_markdown: draft.content_markdown.clone(),
            published_at: None,
        };

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            post.slug = self.slugs.allocate(draft.slug_seed(), Some(uuid)).await?;
            match self.posts.update_by_uuid(uuid, &post).await {
                Ok(Some(updated)) => {
                    info!(post_uuid = %uuid, slug = %updated.slug, "post updated");
                    return Ok(updated);
                }
                Ok(None) => return Err(PostError::NotFound(uuid)),
                Err(RepoError::SlugTaken(slug)) => {
                    warn!(%slug, attempt, "slug claimed concurrently, retrying");
                }
                Err(RepoError::Other(e)) => return Err(e.context("error on update post").into()),
            }
        }
        Err(PostError::Conflict(format!(
            "could not reserve a slug for '{}'",
            draft.title
        )))
    }

    /// Stamps the post with the current time. Publishing again refreshes the
    /// stamp; a post never returns to draft.
    #[instrument(skip(self))]
    pub async fn publish(&self, uuid: Uuid) -> Result<Post, PostError> {
        let post = self
            .posts
            .set_published_at(uuid, OffsetDateTime::now_utc())
            .await
            .context("error on publish post")?
            .ok_or(PostError::NotFound(uuid))?;
        info!(post_uuid = %uuid, "post published");
        Ok(post)
    }

    pub async fn get_by_uuid(&self, uuid: Uuid) -> Result<Post, PostError> {
        self.posts
            .find_by_uuid(uuid)
            .await
            .context("error on find by uuid")?
            .ok_or(PostError::NotFound(uuid))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Post, PostError> {
        self.posts
            .find_by_slug(slug)
            .await
            .context("error on find by slug")?
            .ok_or_else(|| PostError::SlugNotFound(slug.to_string()))
    }

    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Post, PostError> {
        let post = self.get_by_slug(slug).await?;
        if !post.is_published() {
            debug!(%slug, "draft requested by slug");
            return Err(PostError::NotPublished(slug.to_string()));
        }
        Ok(post)
    }

    pub async fn list(&self) -> Result<Vec<Post>, PostError> {
        Ok(self.posts.list().await.context("error on list posts")?)
    }

    pub async fn list_published(&self) -> Result<Vec<Post>, PostError> {
        Ok(self
            .posts
            .list_published()
            .await
            .context("error on list published posts")?)
    }
}
