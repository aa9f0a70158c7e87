//! Operation bodies behind the graph roots.
//!
//! Each operation receives the caller as an explicit [`Viewer`]; gated ones
//! check it before touching a service. The `#[Object]` roots only pull
//! collaborators out of the schema context and delegate here.

use async_graphql::connection::Connection;
use tracing::debug;

use super::{
    connection::{paginate, ArrayCursor, PageArgs},
    node::{GlobalId, NodeKind},
    parse_uuid,
    types::{
        CreatePostRequest, LogInRequest, LogInResponse, Node, PostNode, UpdatePostByUuidRequest,
        UserNode,
    },
};
use crate::{
    auth::{
        extractors::Viewer,
        services::{AuthError, IdentityService},
    },
    error::AppError,
    posts::services::{PostError, PostService},
};

pub async fn me(viewer: Viewer, identity: &IdentityService) -> Result<UserNode, AppError> {
    let uuid = viewer.require()?;
    Ok(UserNode(identity.identity_from_uuid(uuid).await?))
}

/// Unknown ids and drafts hidden from anonymous callers both resolve to `None`.
pub async fn node(
    viewer: Viewer,
    identity: &IdentityService,
    posts: &PostService,
    id: &str,
) -> Result<Option<Node>, AppError> {
    let gid = GlobalId::decode(id).map_err(|e| AppError::Validation(e.to_string()))?;

    match gid.kind {
        NodeKind::User => {
            viewer.require()?;
            match identity.identity_from_uuid(gid.uuid).await {
                Ok(user) => Ok(Some(Node::User(UserNode(user)))),
                Err(AuthError::UserNotFound(_)) => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
        NodeKind::Post => match posts.get_by_uuid(gid.uuid).await {
            Ok(post) if post.is_published() || viewer.is_authenticated() => {
                Ok(Some(Node::Post(PostNode(post))))
            }
            Ok(post) => {
                debug!(post_uuid = %post.uuid, "draft hidden from anonymous node lookup");
                Ok(None)
            }
            Err(PostError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        },
    }
}

pub async fn get_post_by_uuid(
    viewer: Viewer,
    posts: &PostService,
    uuid: &str,
) -> Result<PostNode, AppError> {
    viewer.require()?;
    let uuid = parse_uuid(uuid)?;
    Ok(PostNode(posts.get_by_uuid(uuid).await?))
}

pub async fn get_published_post_by_slug(
    posts: &PostService,
    slug: &str,
) -> Result<PostNode, AppError> {
    Ok(PostNode(posts.get_published_by_slug(slug).await?))
}

pub async fn list_posts(
    viewer: Viewer,
    posts: &PostService,
    args: &PageArgs,
) -> Result<Connection<ArrayCursor, PostNode>, AppError> {
    viewer.require()?;
    paginate(posts.list().await?, args, PostNode)
}

pub async fn list_published_posts(
    posts: &PostService,
    args: &PageArgs,
) -> Result<Connection<ArrayCursor, PostNode>, AppError> {
    paginate(posts.list_published().await?, args, PostNode)
}

pub async fn log_in(
    identity: &IdentityService,
    request: LogInRequest,
) -> Result<LogInResponse, AppError> {
    let outcome = identity.login(&request.username, &request.password).await?;
    Ok(LogInResponse {
        access_token: outcome.access_token,
        user_uuid: outcome.user_uuid,
    })
}

pub async fn create_post(
    viewer: Viewer,
    posts: &PostService,
    request: CreatePostRequest,
) -> Result<PostNode, AppError> {
    viewer.require()?;
    Ok(PostNode(posts.create(request.into()).await?))
}

pub async fn update_post_by_uuid(
    viewer: Viewer,
    posts: &PostService,
    uuid: &str,
    request: UpdatePostByUuidRequest,
) -> Result<PostNode, AppError> {
    viewer.require()?;
    let uuid = parse_uuid(uuid)?;
    Ok(PostNode(posts.update(uuid, request.into()).await?))
}

pub async fn publish_post_by_uuid(
    viewer: Viewer,
    posts: &PostService,
    uuid: &str,
) -> Result<PostNode, AppError> {
    viewer.require()?;
    let uuid = parse_uuid(uuid)?;
    Ok(PostNode(posts.publish(uuid).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        posts::services::PostDraft,
        test_support::{test_keys, InMemoryPostRepository, InMemoryUserRepository},
    };

    struct Services {
        identity: IdentityService,
        posts: PostService,
        author: Uuid,
    }

    fn services() -> Services {
        let users = InMemoryUserRepository::default();
        let author = users.add("naser", "s3cret");
        Services {
            identity: IdentityService::new(Arc::new(users), test_keys()),
            posts: PostService::new(Arc::new(InMemoryPostRepository::default())),
            author,
        }
    }

    fn create_request(title: &str) -> CreatePostRequest {
        CreatePostRequest {
            title: title.into(),
            slug: None,
            content_markdown: String::new(),
        }
    }

    #[tokio::test]
    async fn gated_operations_refuse_anonymous_viewer() {
        let s = services();
        let anon = Viewer(None);
        let some_uuid = Uuid::new_v4().to_string();

        assert!(matches!(me(anon, &s.identity).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            create_post(anon, &s.posts, create_request("Hidden")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            publish_post_by_uuid(anon, &s.posts, &some_uuid).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            get_post_by_uuid(anon, &s.posts, &some_uuid).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            list_posts(anon, &s.posts, &PageArgs::default()).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(s.posts.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_viewer_reaches_the_services() {
        let s = services();
        let viewer = Viewer(Some(s.author));

        let user = me(viewer, &s.identity).await.unwrap();
        assert_eq!(user.0.uuid, s.author);

        let created = create_post(viewer, &s.posts, create_request("Hello")).await.unwrap();
        let uuid = created.0.uuid.to_string();
        let published = publish_post_by_uuid(viewer, &s.posts, &uuid).await.unwrap();
        assert!(published.0.is_published());

        let public = get_published_post_by_slug(&s.posts, "hello").await.unwrap();
        assert_eq!(public.0.uuid, created.0.uuid);
    }

    #[tokio::test]
    async fn node_hides_drafts_from_anonymous_viewer_only() {
        let s = services();
        let draft = s
            .posts
            .create(PostDraft {
                title: "Draft".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let id = GlobalId::new(NodeKind::Post, draft.uuid).encode();

        let anon = node(Viewer(None), &s.identity, &s.posts, &id).await.unwrap();
        assert!(anon.is_none());
        let authed = node(Viewer(Some(s.author)), &s.identity, &s.posts, &id)
            .await
            .unwrap();
        assert!(matches!(authed, Some(Node::Post(p)) if p.0.uuid == draft.uuid));

        let user_id = GlobalId::new(NodeKind::User, s.author).encode();
        assert!(matches!(
            node(Viewer(None), &s.identity, &s.posts, &user_id).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
