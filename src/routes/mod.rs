pub mod api;
pub mod sse;
pub mod ui;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::clients::CommandError;
use crate::models::stack::StackAction;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // JSON API
        .route("/api/stacks", get(api::handle_list_stacks))
        .route("/api/sync", post(api::handle_sync))
        .route("/api/instances", get(api::handle_list_instances))
        .route("/api/filter", put(api::handle_set_filter))
        .route(
            "/api/stacks/{instance}/{id}/{action}",
            post(api::handle_stack_action),
        )
        // Health
        .route("/healthz", get(api::handle_healthz))
        // Console UI
        .route("/ui/", get(ui::handle_dashboard))
        .route("/ui/sync", post(ui::handle_sync))
        .route("/ui/filter", post(ui::handle_filter))
        .route(
            "/ui/stacks/{instance}/{id}/{action}",
            post(ui::handle_stack_action),
        )
        .route("/ui/events", get(sse::handle_stack_events))
        // Static files
        .nest_service("/ui/static", ServeDir::new("static"))
        // Root redirect
        .route(
            "/",
            get(|| async {
                axum::response::Redirect::to("/ui/")
            }),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("stack {id} on instance #{instance} is not in the current stack list")]
    NotFound { instance: usize, id: String },

    #[error("failed to {action} {name}: {source}")]
    Command {
        name: String,
        action: &'static str,
        #[source]
        source: CommandError,
    },
}

/// Runs `action` against a stack from the latest snapshot, then refreshes so
/// the next render shows the server's view of its status.
pub async fn run_stack_action(
    state: &AppState,
    instance: usize,
    id: &str,
    action: StackAction,
) -> Result<String, ActionError> {
    let snapshot = state.refresher.latest();
    let stack = snapshot
        .find(instance, id)
        .ok_or_else(|| ActionError::NotFound {
            instance,
            id: id.to_string(),
        })?;

    let result = state.sync.apply(stack, action).await;
    state.refresher.refresh().await;

    match result {
        Ok(_) => Ok(format!("{} has {}!", stack.name, action.past_tense())),
        Err(source) => Err(ActionError::Command {
            name: stack.name.clone(),
            action: action.path_segment(),
            source,
        }),
    }
}
