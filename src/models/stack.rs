use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::clients::TransportError;
use crate::registry::Instance;

// Wire type for `GET /api/stacks`. The server sends many more fields; only
// these three are read.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteStack {
    pub name: String,
    pub status: i64,
    pub id: StackId,
}

/// Remote stack identifier, kept in whichever JSON form the server used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StackId {
    Number(i64),
    Text(String),
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackId::Number(n) => write!(f, "{}", n),
            StackId::Text(s) => f.write_str(s),
        }
    }
}

impl StackId {
    /// Compares against an id taken from a URL path or command line.
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            StackId::Number(n) => raw.parse::<i64>().map(|r| r == *n).unwrap_or(false),
            StackId::Text(s) => s == raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    Active,
    Inactive,
}

impl StackStatus {
    /// The server reports 1 for a running stack; anything else is treated as stopped.
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            StackStatus::Active
        } else {
            StackStatus::Inactive
        }
    }

    /// The command that flips this status.
    pub fn toggle_action(self) -> StackAction {
        match self {
            StackStatus::Active => StackAction::Stop,
            StackStatus::Inactive => StackAction::Start,
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackStatus::Active => f.pad("ACTIVE"),
            StackStatus::Inactive => f.pad("INACTIVE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackAction {
    Start,
    Stop,
}

impl StackAction {
    pub fn path_segment(self) -> &'static str {
        match self {
            StackAction::Start => "start",
            StackAction::Stop => "stop",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            StackAction::Start => "started",
            StackAction::Stop => "stopped",
        }
    }
}

/// A stack as seen in one fetch, tagged with the instance that reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub name: String,
    pub id: StackId,
    pub status: StackStatus,
    pub instance: Arc<Instance>,
}

impl Stack {
    pub fn from_remote(remote: RemoteStack, instance: Arc<Instance>) -> Self {
        Self {
            name: remote.name,
            id: remote.id,
            status: StackStatus::from_code(remote.status),
            instance,
        }
    }
}

#[derive(Debug)]
pub struct FetchFailure {
    pub instance: String,
    pub error: TransportError,
}

/// Everything one fetch cycle produced. Replaced wholesale by the next one.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub stacks: Vec<Stack>,
    pub failures: Vec<FetchFailure>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The stack with id `id` reported by the instance at registry position `instance`.
    pub fn find(&self, instance: usize, id: &str) -> Option<&Stack> {
        self.stacks
            .iter()
            .find(|s| s.instance.index == instance && s.id.matches(id))
    }

    /// First stack on an instance called `instance` whose name or id is `key`.
    pub fn find_by_name_or_id(&self, instance: &str, key: &str) -> Option<&Stack> {
        let on_instance = || self.stacks.iter().filter(move |s| s.instance.name == instance);
        on_instance()
            .find(|s| s.name == key)
            .or_else(|| on_instance().find(|s| s.id.matches(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(index: usize, name: &str) -> Arc<Instance> {
        let mut inst = Instance::new(name, format!("http://{name}"), "k");
        inst.index = index;
        Arc::new(inst)
    }

    #[test]
    fn status_one_is_active_everything_else_inactive() {
        assert_eq!(StackStatus::from_code(1), StackStatus::Active);
        for code in [0, 2, 3, -1, i64::MAX] {
            assert_eq!(StackStatus::from_code(code), StackStatus::Inactive);
        }
    }

    #[test]
    fn remote_stack_accepts_numeric_and_string_ids() {
        let list: Vec<RemoteStack> = serde_json::from_str(
            r#"[
                {"Id": 5, "Name": "web", "Status": 1, "EndpointId": 2, "Env": []},
                {"Id": "abc", "Name": "db", "Status": 2}
            ]"#,
        )
        .unwrap();

        assert_eq!(list[0].id, StackId::Number(5));
        assert_eq!(list[1].id, StackId::Text("abc".to_string()));
        assert_eq!(list[0].id.to_string(), "5");
    }

    #[test]
    fn remote_stack_without_status_is_rejected() {
        let res: Result<Vec<RemoteStack>, _> =
            serde_json::from_str(r#"[{"Id": 1, "Name": "web"}]"#);
        assert!(res.is_err());
    }

    #[test]
    fn from_remote_tags_instance() {
        let a = instance(0, "A");
        let stack = Stack::from_remote(
            RemoteStack {
                name: "web".to_string(),
                status: 2,
                id: StackId::Text("5".to_string()),
            },
            a.clone(),
        );
        assert_eq!(stack.status, StackStatus::Inactive);
        assert_eq!(stack.status.toggle_action(), StackAction::Start);
        assert!(Arc::ptr_eq(&stack.instance, &a));
    }

    #[test]
    fn id_matching_is_form_aware() {
        assert!(StackId::Number(5).matches("5"));
        assert!(!StackId::Number(5).matches("05x"));
        assert!(StackId::Text("05".to_string()).matches("05"));
        assert!(!StackId::Text("05".to_string()).matches("5"));
    }

    #[test]
    fn find_scopes_by_registry_position() {
        let snap = Snapshot {
            stacks: vec![
                Stack {
                    name: "web".to_string(),
                    id: StackId::Number(1),
                    status: StackStatus::Active,
                    instance: instance(0, "A"),
                },
                Stack {
                    name: "web".to_string(),
                    id: StackId::Number(1),
                    status: StackStatus::Inactive,
                    instance: instance(1, "A"),
                },
            ],
            ..Default::default()
        };

        assert_eq!(snap.find(0, "1").unwrap().status, StackStatus::Active);
        assert_eq!(snap.find(1, "1").unwrap().status, StackStatus::Inactive);
        assert!(snap.find(2, "1").is_none());
        assert_eq!(
            snap.find_by_name_or_id("A", "web").unwrap().status,
            StackStatus::Active
        );
        assert_eq!(snap.find_by_name_or_id("A", "1").unwrap().instance.index, 0);
        assert!(snap.find_by_name_or_id("B", "web").is_none());
    }
}
