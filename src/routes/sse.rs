use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;

use crate::AppState;

use super::ui::render_stack_rows;

/// Streams the rendered stack list to the browser every time a new snapshot
/// is published, starting with the current one.
pub async fn handle_stack_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.refresher.subscribe()).filter_map(|snapshot| async move {
        match render_stack_rows(&snapshot) {
            // Event::data rejects carriage returns; remote error bodies may carry them.
            Ok(html) => Some(Ok(Event::default().event("stacks").data(html.replace('\r', "")))),
            Err(e) => {
                tracing::error!("template error: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
}
