use std::sync::Arc;

use async_graphql::{connection::Connection, Context, Object, Result, ID};

use super::{
    connection::{ArrayCursor, PageArgs},
    resolvers,
    types::{Node, PostNode, UserNode},
    viewer, GraphResult,
};
use crate::{auth::services::IdentityService, posts::services::PostService};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn health(&self) -> &'static str {
        "ok"
    }

    /// The authenticated caller.
    async fn me(&self, ctx: &Context<'_>) -> Result<UserNode> {
        let identity = ctx.data::<Arc<IdentityService>>()?;
        resolvers::me(viewer(ctx), identity).await.graph()
    }

    /// Resolves a global id. Unknown ids and drafts hidden from anonymous
    /// callers both resolve to `null`.
    async fn node(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Node>> {
        let identity = ctx.data::<Arc<IdentityService>>()?;
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::node(viewer(ctx), identity, posts, &id).await.graph()
    }

    #[graphql(name = "getPostByUUID")]
    async fn get_post_by_uuid(&self, ctx: &Context<'_>, uuid: ID) -> Result<PostNode> {
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::get_post_by_uuid(viewer(ctx), posts, &uuid).await.graph()
    }

    async fn get_published_post_by_slug(&self, ctx: &Context<'_>, slug: String) -> Result<PostNode> {
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::get_published_post_by_slug(posts, &slug).await.graph()
    }

    /// Every post, drafts included.
    async fn list_posts(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<ArrayCursor, PostNode>> {
        let args = PageArgs { after, before, first, last };
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::list_posts(viewer(ctx), posts, &args).await.graph()
    }

    async fn list_published_posts(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<ArrayCursor, PostNode>> {
        let args = PageArgs { after, before, first, last };
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::list_published_posts(posts, &args).await.graph()
    }
}
