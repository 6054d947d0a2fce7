use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stack::{Snapshot, Stack, StackAction, StackStatus};

#[derive(Debug, Clone, Serialize)]
pub struct InstanceView {
    pub index: usize,
    pub name: String,
    pub url: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StackView {
    pub name: String,
    pub id: String,
    pub instance: String,
    pub instance_index: usize,
    pub status: StackStatus,
    pub action: StackAction,
    #[serde(skip)]
    pub label: String,
    #[serde(skip)]
    pub button_label: String,
    #[serde(skip)]
    pub button_class: String,
}

impl From<&Stack> for StackView {
    fn from(stack: &Stack) -> Self {
        let action = stack.status.toggle_action();
        StackView {
            name: stack.name.clone(),
            id: stack.id.to_string(),
            instance: stack.instance.name.clone(),
            instance_index: stack.instance.index,
            status: stack.status,
            action,
            label: format!("{} @ {}", stack.name, stack.instance.name),
            button_label: action.path_segment().to_uppercase(),
            button_class: match action {
                StackAction::Stop => "btn-stop",
                StackAction::Start => "btn-start",
            }
            .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureView {
    pub instance: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub fetched_at: Option<DateTime<Utc>>,
    pub stacks: Vec<StackView>,
    pub failures: Vec<FailureView>,
}

impl From<&Snapshot> for SnapshotView {
    fn from(snap: &Snapshot) -> Self {
        SnapshotView {
            fetched_at: snap.fetched_at,
            stacks: snap.stacks.iter().map(StackView::from).collect(),
            failures: snap
                .failures
                .iter()
                .map(|f| FailureView {
                    instance: f.instance.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Outcome banner shown above the stack list after a button press.
#[derive(Debug, Clone)]
pub struct Notice {
    pub ok: bool,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Notice {
            ok: true,
            text: text.into(),
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Notice {
            ok: false,
            text: text.into(),
        }
    }
}
