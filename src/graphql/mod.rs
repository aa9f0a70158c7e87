//! Relay-style graph API over users and posts.

pub mod connection;
pub mod handlers;
mod mutation;
pub mod node;
mod query;
mod resolvers;
pub mod types;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Schema};
use uuid::Uuid;

use crate::{
    auth::{extractors::Viewer, services::IdentityService},
    error::AppError,
    posts::services::PostService,
};

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(identity: Arc<IdentityService>, posts: Arc<PostService>) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(identity)
        .data(posts)
        .limit_depth(16)
        .finish()
}

/// Converts component errors into coded graph errors.
pub(crate) trait GraphResult<T> {
    fn graph(self) -> async_graphql::Result<T>;
}

impl<T, E: Into<AppError>> GraphResult<T> for Result<T, E> {
    fn graph(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.into().extend())
    }
}

/// The caller attached to the request; requests executed without one are
/// anonymous. Resolvers hand it to [`resolvers`] explicitly.
pub(crate) fn viewer(ctx: &Context<'_>) -> Viewer {
    ctx.data_opt::<Viewer>().copied().unwrap_or_default()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("invalid uuid '{raw}'")))
}
