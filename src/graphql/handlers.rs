use async_graphql::{http::GraphiQLSource, Request, Variables};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{auth::extractors::Viewer, error::AppError, state::AppState};

/// `GET /graphql` query-string form; `variables` is a JSON document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQueryParams {
    pub query: Option<String>,
    pub operation_name: Option<String>,
    pub variables: Option<String>,
}

pub fn graphql_routes() -> Router<AppState> {
    Router::new().route("/graphql", get(graphql_get).post(graphql_post))
}

#[instrument(skip_all)]
pub async fn graphql_post(
    State(state): State<AppState>,
    viewer: Viewer,
    payload: Result<Json<Request>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|e| {
        debug!(error = %e, "undecodable graphql body");
        AppError::Validation(format!("invalid graphql request: {}", e.body_text()))
    })?;
    Ok(execute(&state, viewer, request).await)
}

#[instrument(skip_all)]
pub async fn graphql_get(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(params): Query<GraphQueryParams>,
) -> Result<Response, AppError> {
    let Some(query) = params.query else {
        if state.config.graphiql {
            return Ok(Html(GraphiQLSource::build().endpoint("/graphql").finish()).into_response());
        }
        return Err(AppError::Validation("missing graphql query".into()));
    };

    let mut request = Request::new(query);
    if let Some(name) = params.operation_name {
        request = request.operation_name(name);
    }
    if let Some(raw) = params.variables.filter(|v| !v.trim().is_empty()) {
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|_| AppError::Validation("invalid graphql variables".into()))?;
        request = request.variables(Variables::from_json(value));
    }
    Ok(execute(&state, viewer, request).await)
}

// Field errors travel inside the body; the status stays 200.
async fn execute(state: &AppState, viewer: Viewer, request: Request) -> Response {
    let response = state.schema.execute(request.data(viewer)).await;
    Json(response).into_response()
}
