use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::models::stack::StackAction;
use crate::models::views::{InstanceView, SnapshotView};
use crate::registry::InstanceFilter;
use crate::AppState;

use super::{ActionError, run_stack_action};

pub async fn handle_list_stacks(State(state): State<AppState>) -> Json<SnapshotView> {
    Json(SnapshotView::from(state.refresher.latest().as_ref()))
}

pub async fn handle_sync(State(state): State<AppState>) -> Json<SnapshotView> {
    let snapshot = state.refresher.refresh().await;
    Json(SnapshotView::from(snapshot.as_ref()))
}

#[derive(Serialize)]
pub struct InstanceList {
    pub filter: String,
    pub instances: Vec<InstanceView>,
}

pub async fn handle_list_instances(State(state): State<AppState>) -> Json<InstanceList> {
    Json(InstanceList {
        filter: state.sync.filter().await.to_string(),
        instances: state.sync.instances().await,
    })
}

#[derive(Deserialize)]
pub struct FilterRequest {
    pub selector: String,
}

pub async fn handle_set_filter(
    State(state): State<AppState>,
    Json(req): Json<FilterRequest>,
) -> Json<InstanceList> {
    state
        .sync
        .set_active_filter(InstanceFilter::parse(&req.selector))
        .await;
    state.refresher.refresh().await;
    handle_list_instances(State(state)).await
}

#[derive(Serialize)]
pub struct ActionResult {
    pub message: String,
}

pub async fn handle_stack_action(
    State(state): State<AppState>,
    Path((instance, id, action)): Path<(usize, String, StackAction)>,
) -> Response {
    match run_stack_action(&state, instance, &id, action).await {
        Ok(message) => Json(ActionResult { message }).into_response(),
        Err(e @ ActionError::NotFound { .. }) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e @ ActionError::Command { .. }) => {
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

pub async fn handle_healthz() -> &'static str {
    "ok\n"
}
