use std::sync::Arc;

use async_graphql::{Context, InputObject, Interface, Object, Result, ID};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::{
    node::{GlobalId, NodeKind},
    GraphResult,
};
use crate::{
    auth::{repo_types::User, services::IdentityService},
    posts::{repo_types::Post, services::PostDraft},
};

pub struct UserNode(pub User);

#[Object(name = "User")]
impl UserNode {
    async fn id(&self) -> ID {
        GlobalId::new(NodeKind::User, self.0.uuid).encode()
    }

    async fn uuid(&self) -> ID {
        ID(self.0.uuid.to_string())
    }

    async fn username(&self) -> &str {
        &self.0.username
    }
}

pub struct PostNode(pub Post);

#[Object(name = "Post")]
impl PostNode {
    async fn id(&self) -> ID {
        GlobalId::new(NodeKind::Post, self.0.uuid).encode()
    }

    async fn uuid(&self) -> ID {
        ID(self.0.uuid.to_string())
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn slug(&self) -> &str {
        &self.0.slug
    }

    async fn content_markdown(&self) -> &str {
        &self.0.content_markdown
    }

    #[graphql(name = "contentHTML")]
    async fn content_html(&self) -> &str {
        &self.0.content_html
    }

    /// RFC 3339 timestamp, `null` while the post is a draft.
    async fn published_at(&self) -> Option<String> {
        self.0.published_at.and_then(|t| t.format(&Rfc3339).ok())
    }
}

#[derive(Interface)]
#[graphql(field(name = "id", ty = "ID"))]
pub enum Node {
    User(UserNode),
    Post(PostNode),
}

pub struct LogInResponse {
    pub access_token: String,
    pub user_uuid: Uuid,
}

#[Object]
impl LogInResponse {
    async fn access_token(&self) -> &str {
        &self.access_token
    }

    async fn user(&self, ctx: &Context<'_>) -> Result<UserNode> {
        let identity = ctx.data::<Arc<IdentityService>>()?;
        identity
            .identity_from_uuid(self.user_uuid)
            .await
            .map(UserNode)
            .graph()
    }
}

#[derive(Debug, InputObject)]
pub struct LogInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, InputObject)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub content_markdown: String,
}

#[derive(Debug, InputObject)]
#[graphql(name = "UpdatePostByUUIDRequest")]
pub struct UpdatePostByUuidRequest {
    pub title: String,
    pub slug: Option<String>,
    pub content_markdown: String,
}

impl From<CreatePostRequest> for PostDraft {
    fn from(r: CreatePostRequest) -> Self {
        PostDraft {
            title: r.title,
            slug: r.slug,
            content_markdown: r.content_markdown,
        }
    }
}

impl From<UpdatePostByUuidRequest> for PostDraft {
    fn from(r: UpdatePostByUuidRequest) -> Self {
        PostDraft {
            title: r.title,
            slug: r.slug,
            content_markdown: r.content_markdown,
        }
    }
}
