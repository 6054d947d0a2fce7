use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::helpers::human_time;
use crate::models::stack::{Snapshot, StackAction};
use crate::models::views::*;
use crate::registry::InstanceFilter;
use crate::AppState;

use super::run_stack_action;

fn render_template(tmpl: &impl Template) -> Response {
    match tmpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

// --- Stack rows ---

#[derive(Template)]
#[template(path = "stack_rows.html")]
struct StackRowsTemplate {
    stacks: Vec<StackView>,
    failures: Vec<FailureView>,
    last_synced: String,
}

impl StackRowsTemplate {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let view = SnapshotView::from(snapshot);
        StackRowsTemplate {
            stacks: view.stacks,
            failures: view.failures,
            last_synced: human_time(view.fetched_at),
        }
    }
}

pub fn render_stack_rows(snapshot: &Snapshot) -> Result<String, askama::Error> {
    StackRowsTemplate::from_snapshot(snapshot).render()
}

// --- Dashboard ---

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    title: String,
    filter: String,
    instances: Vec<InstanceView>,
    notice: Option<Notice>,
    poll_interval_secs: u64,
    rows_html: String,
}

async fn dashboard(state: &AppState, notice: Option<Notice>) -> Response {
    let snapshot = state.refresher.latest();
    let rows_html = match render_stack_rows(&snapshot) {
        Ok(html) => html,
        Err(e) => {
            tracing::error!("template error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    let tmpl = DashboardTemplate {
        title: "Available stacks".to_string(),
        filter: state.sync.filter().await.to_string(),
        instances: state.sync.instances().await,
        notice,
        poll_interval_secs: state.refresher.interval().as_secs(),
        rows_html,
    };

    render_template(&tmpl)
}

pub async fn handle_dashboard(State(state): State<AppState>) -> Response {
    dashboard(&state, None).await
}

pub async fn handle_sync(State(state): State<AppState>) -> Redirect {
    tracing::info!("sync requested");
    state.refresher.refresh().await;
    Redirect::to("/ui/")
}

#[derive(Deserialize)]
pub struct FilterForm {
    pub selector: String,
}

pub async fn handle_filter(
    State(state): State<AppState>,
    Form(form): Form<FilterForm>,
) -> Redirect {
    state
        .sync
        .set_active_filter(InstanceFilter::parse(&form.selector))
        .await;
    state.refresher.refresh().await;
    Redirect::to("/ui/")
}

pub async fn handle_stack_action(
    State(state): State<AppState>,
    Path((instance, id, action)): Path<(usize, String, StackAction)>,
) -> Response {
    let notice = match run_stack_action(&state, instance, &id, action).await {
        Ok(message) => Notice::success(message),
        Err(e) => Notice::failure(e.to_string()),
    };
    dashboard(&state, Some(notice)).await
}
