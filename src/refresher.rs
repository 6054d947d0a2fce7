use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::clients::sync::SyncClient;
use crate::models::stack::Snapshot;

/// Drives fetches on a timer or on request and publishes each result.
///
/// Only one fetch runs at a time; a refresh requested while another is in
/// flight waits for it and then fetches again.
pub struct Refresher {
    sync: Arc<SyncClient>,
    interval: Duration,
    gate: Mutex<()>,
    tx: watch::Sender<Arc<Snapshot>>,
}

impl Refresher {
    pub fn new(sync: Arc<SyncClient>, interval: Duration) -> Self {
        let (tx, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            sync,
            interval,
            gate: Mutex::new(()),
            tx,
        }
    }

    pub async fn refresh(&self) -> Arc<Snapshot> {
        let _guard = self.gate.lock().await;
        let snapshot = Arc::new(self.sync.fetch_stacks().await);
        debug!(
            "published {} stacks ({} instances failed)",
            snapshot.stacks.len(),
            snapshot.failures.len()
        );
        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    pub fn latest(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<()>) {
        self.refresh().await;

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // skip first immediate tick

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.refresh().await;
                }
                _ = shutdown.changed() => {
                    info!("refresher shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::StackApi;
    use crate::config::InstanceDef;
    use crate::registry::InstanceRegistry;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn refresher_for(server: &MockServer) -> Arc<Refresher> {
        let registry = InstanceRegistry::load(&[InstanceDef {
            name: "A".to_string(),
            url: server.uri(),
            api_key: "k".to_string(),
        }])
        .unwrap();
        let sync = Arc::new(SyncClient::new(StackApi::new(None).unwrap(), registry));
        Arc::new(Refresher::new(sync, Duration::from_millis(50)))
    }

    async fn serve(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/stacks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"Name": "web", "Status": 1, "Id": 1}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn starts_with_an_empty_snapshot() {
        let server = MockServer::start().await;
        let refresher = refresher_for(&server).await;
        let latest = refresher.latest();
        assert!(latest.stacks.is_empty());
        assert!(latest.fetched_at.is_none());
    }

    #[tokio::test]
    async fn refresh_publishes_to_subscribers() {
        let server = MockServer::start().await;
        serve(&server).await;
        let refresher = refresher_for(&server).await;
        let mut rx = refresher.subscribe();

        let snap = refresher.refresh().await;

        rx.changed().await.unwrap();
        assert!(Arc::ptr_eq(&*rx.borrow_and_update(), &snap));
        assert_eq!(refresher.latest().stacks.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_refreshes_do_not_overlap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stacks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(std::time::Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        let refresher = refresher_for(&server).await;

        let started = std::time::Instant::now();
        let (a, b) = tokio::join!(refresher.refresh(), refresher.refresh());

        assert!(started.elapsed() >= std::time::Duration::from_millis(200));
        assert!(a.fetched_at <= b.fetched_at);
        assert!(Arc::ptr_eq(&refresher.latest(), &b));
    }

    #[tokio::test]
    async fn run_fetches_until_shutdown() {
        let server = MockServer::start().await;
        serve(&server).await;
        let refresher = refresher_for(&server).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(refresher.clone().run(shutdown_rx));
        time::sleep(Duration::from_millis(180)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let hits = server.received_requests().await.unwrap().len();
        assert!(hits >= 2, "expected repeated fetches, got {hits}");
        assert_eq!(refresher.latest().stacks.len(), 1);
    }
}
