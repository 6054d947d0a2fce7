use chrono::Utc;
use futures_util::future::join_all;
use reqwest::StatusCode;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::stack::{FetchFailure, Snapshot, Stack, StackAction};
use crate::models::views::InstanceView;
use crate::registry::{InstanceFilter, InstanceRegistry};

use super::{CommandError, StackApi};

/// Fetches stacks from the active instances and sends start/stop commands
/// to the instance that owns a stack.
///
/// Fetches are not serialized here; callers go through
/// [`crate::refresher::Refresher`] for that.
pub struct SyncClient {
    api: StackApi,
    registry: RwLock<InstanceRegistry>,
}

impl SyncClient {
    pub fn new(api: StackApi, registry: InstanceRegistry) -> Self {
        Self {
            api,
            registry: RwLock::new(registry),
        }
    }

    pub async fn fetch_stacks(&self) -> Snapshot {
        let instances = self.registry.read().await.active();

        let results = join_all(instances.iter().map(|inst| self.api.list_stacks(inst))).await;

        let mut snapshot = Snapshot::default();
        for (inst, result) in instances.into_iter().zip(results) {
            match result {
                Ok(list) => {
                    debug!("{} stacks from {}", list.len(), inst.name);
                    snapshot
                        .stacks
                        .extend(list.into_iter().map(|r| Stack::from_remote(r, inst.clone())));
                }
                Err(e) => {
                    warn!("error listing stacks from {}: {}", inst.name, e);
                    snapshot.failures.push(FetchFailure {
                        instance: inst.name.clone(),
                        error: e,
                    });
                }
            }
        }
        snapshot.fetched_at = Some(Utc::now());

        snapshot
    }

    pub async fn start_stack(&self, stack: &Stack) -> Result<StatusCode, CommandError> {
        self.send(stack, StackAction::Start).await
    }

    pub async fn stop_stack(&self, stack: &Stack) -> Result<StatusCode, CommandError> {
        self.send(stack, StackAction::Stop).await
    }

    /// Dispatches to [`SyncClient::start_stack`] or [`SyncClient::stop_stack`].
    pub async fn apply(&self, stack: &Stack, action: StackAction) -> Result<StatusCode, CommandError> {
        match action {
            StackAction::Start => self.start_stack(stack).await,
            StackAction::Stop => self.stop_stack(stack).await,
        }
    }

    async fn send(&self, stack: &Stack, action: StackAction) -> Result<StatusCode, CommandError> {
        info!(
            "{} stack {} (id {}) on {}",
            action.path_segment(),
            stack.name,
            stack.id,
            stack.instance.name
        );
        match self.api.send_action(&stack.instance, &stack.id, action).await {
            Ok(status) => Ok(status),
            Err(e) => {
                warn!("{} {} on {} failed: {}", action.path_segment(), stack.name, stack.instance.name, e);
                Err(e)
            }
        }
    }

    pub async fn set_active_filter(&self, filter: InstanceFilter) -> usize {
        self.registry.write().await.set_active_filter(filter)
    }

    pub async fn filter(&self) -> InstanceFilter {
        self.registry.read().await.filter().clone()
    }

    pub async fn instances(&self) -> Vec<InstanceView> {
        self.registry
            .read()
            .await
            .iter()
            .map(|(inst, active)| InstanceView {
                index: inst.index,
                name: inst.name.clone(),
                url: inst.url.clone(),
                active,
            })
            .collect()
    }
}
