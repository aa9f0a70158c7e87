use std::sync::Arc;

use async_graphql::{Context, Object, Result, ID};

use super::{
    resolvers,
    types::{CreatePostRequest, LogInRequest, LogInResponse, PostNode, UpdatePostByUuidRequest},
    viewer, GraphResult,
};
use crate::{auth::services::IdentityService, posts::services::PostService};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn log_in(&self, ctx: &Context<'_>, request: LogInRequest) -> Result<LogInResponse> {
        let identity = ctx.data::<Arc<IdentityService>>()?;
        resolvers::log_in(identity, request).await.graph()
    }

    async fn create_post(&self, ctx: &Context<'_>, request: CreatePostRequest) -> Result<PostNode> {
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::create_post(viewer(ctx), posts, request).await.graph()
    }

    #[graphql(name = "updatePostByUUID")]
    async fn update_post_by_uuid(
        &self,
        ctx: &Context<'_>,
        uuid: ID,
        request: UpdatePostByUuidRequest,
    ) -> Result<PostNode> {
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::update_post_by_uuid(viewer(ctx), posts, &uuid, request)
            .await
            .graph()
    }

    #[graphql(name = "publishPostByUUID")]
    async fn publish_post_by_uuid(&self, ctx: &Context<'_>, uuid: ID) -> Result<PostNode> {
        let posts = ctx.data::<Arc<PostService>>()?;
        resolvers::publish_post_by_uuid(viewer(ctx), posts, &uuid).await.graph()
    }
}
