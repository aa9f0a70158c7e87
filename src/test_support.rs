//! In-memory collaborators and fixed keys for unit and router tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, password, repo::UserRepository, repo_types::User},
    config::JwtConfig,
    posts::{
        repo::{PostRepository, RepoError},
        repo_types::Post,
    },
    storage::{StorageClient, StoredObject},
};

pub const SIGN_KEY: &str = include_str!("auth/testdata/key_a.pem");
pub const VERIFICATION_KEY: &str = include_str!("auth/testdata/key_a.pub.pem");
/// Valid RSA key that does not match [`VERIFICATION_KEY`].
pub const OTHER_SIGN_KEY: &str = include_str!("auth/testdata/key_b.pem");

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        sign_key: SIGN_KEY.to_string(),
        verification_key: VERIFICATION_KEY.to_string(),
        max_age_minutes: 60,
    }
}

pub fn test_keys() -> Arc<JwtKeys> {
    Arc::new(JwtKeys::from_config(&test_jwt_config()).expect("test keys"))
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    /// Stores a user with an argon2 hash of `secret` and returns its uuid.
    pub fn add(&self, username: &str, secret: &str) -> Uuid {
        let uuid = Uuid::new_v4();
        self.insert(User {
            uuid,
            username: username.to_string(),
            password_hash: password::hash_password(secret).expect("hash"),
        });
        uuid
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_uuid(&self, uuid: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.uuid == uuid).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

/// Keeps insertion order, which stands in for `created_at` ordering.
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: Mutex<Vec<Post>>,
}

impl InMemoryPostRepository {
    /// Stores a post without the uniqueness check.
    pub fn seed(&self, post: Post) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn get(&self, uuid: Uuid) -> Option<Post> {
        self.posts.lock().unwrap().iter().find(|p| p.uuid == uuid).cloned()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_uuid(&self, uuid: Uuid) -> anyhow::Result<Option<Post>> {
        Ok(self.get(uuid))
    }

    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn insert(&self, post: &Post) -> Result<(), RepoError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.iter().any(|p| p.slug == post.slug) {
            return Err(RepoError::SlugTaken(post.slug.clone()));
        }
        posts.push(post.clone());
        Ok(())
    }

    async fn update_by_uuid(&self, uuid: Uuid, post: &Post) -> Result<Option<Post>, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.iter().any(|p| p.slug == post.slug && p.uuid != uuid) {
            return Err(RepoError::SlugTaken(post.slug.clone()));
        }
        Ok(posts.iter_mut().find(|p| p.uuid == uuid).map(|existing| {
            *existing = Post {
                uuid,
                published_at: existing.published_at,
                ..post.clone()
            };
            existing.clone()
        }))
    }

    async fn set_published_at(
        &self,
        uuid: Uuid,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Post>> {
        let mut posts = self.posts.lock().unwrap();
        Ok(posts.iter_mut().find(|p| p.uuid == uuid).map(|existing| {
            existing.published_at = Some(at);
            existing.clone()
        }))
    }

    async fn list(&self) -> anyhow::Result<Vec<Post>> {
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn list_published(&self) -> anyhow::Result<Vec<Post>> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_published())
            .cloned()
            .collect())
    }
}

/// Answers the first `n` slug lookups with `None`, like a reader racing a
/// concurrent insert.
pub struct StaleSlugReads {
    pub inner: InMemoryPostRepository,
    stale_left: AtomicUsize,
}

impl StaleSlugReads {
    pub fn new(n: usize) -> Self {
        Self {
            inner: InMemoryPostRepository::default(),
            stale_left: AtomicUsize::new(n),
        }
    }
}

#[async_trait]
impl PostRepository for StaleSlugReads {
    async fn find_by_uuid(&self, uuid: Uuid) -> anyhow::Result<Option<Post>> {
        self.inner.find_by_uuid(uuid).await
    }

    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>> {
        let stale = self
            .stale_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.find_by_slug(slug).await
    }

    async fn insert(&self, post: &Post) -> Result<(), RepoError> {
        self.inner.insert(post).await
    }

    async fn update_by_uuid(&self, uuid: Uuid, post: &Post) -> Result<Option<Post>, RepoError> {
        self.inner.update_by_uuid(uuid, post).await
    }

    async fn set_published_at(
        &self,
        uuid: Uuid,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Post>> {
        self.inner.set_published_at(uuid, at).await
    }

    async fn list(&self) -> anyhow::Result<Vec<Post>> {
        self.inner.list().await
    }

    async fn list_published(&self) -> anyhow::Result<Vec<Post>> {
        self.inner.list_published().await
    }
}

struct FakeObject {
    body: Bytes,
    content_type: String,
    last_modified: OffsetDateTime,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, FakeObject>>,
}

impl FakeStorage {
    pub fn put_at(&self, key: &str, body: &[u8], content_type: &str, last_modified: OffsetDateTime) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            FakeObject {
                body: Bytes::copy_from_slice(body),
                content_type: content_type.to_string(),
                last_modified,
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.put_at(key, &body, content_type, OffsetDateTime::now_utc());
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<StoredObject>> {
        Ok(self.objects.lock().unwrap().get(key).map(|o| StoredObject {
            body: Body::from(o.body.clone()),
            content_type: o.content_type.clone(),
            last_modified: o.last_modified,
        }))
    }

    async fn object_last_modified(&self, key: &str) -> anyhow::Result<Option<OffsetDateTime>> {
        Ok(self.objects.lock().unwrap().get(key).map(|o| o.last_modified))
    }
}
