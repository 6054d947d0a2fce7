use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::config::{ConfigError, InstanceDef};

/// A remote management server and the key used to talk to it.
#[derive(Clone, PartialEq, Eq)]
pub struct Instance {
    /// Position in the registry; tells apart instances that share a name.
    pub index: usize,
    pub name: String,
    pub url: String,
    api_key: String,
}

impl Instance {
    pub fn new(name: impl Into<String>, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            index: 0,
            name: name.into(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Joins `path` onto the base URL, tolerating a trailing slash in the config.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Which instances take part in a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceFilter {
    All,
    Named(String),
}

impl InstanceFilter {
    pub fn parse(selector: &str) -> Self {
        if selector == "All" {
            InstanceFilter::All
        } else {
            InstanceFilter::Named(selector.to_string())
        }
    }

    pub fn matches(&self, instance: &Instance) -> bool {
        match self {
            InstanceFilter::All => true,
            InstanceFilter::Named(name) => *name == instance.name,
        }
    }
}

impl fmt::Display for InstanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceFilter::All => f.write_str("All"),
            InstanceFilter::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug)]
struct Entry {
    instance: Arc<Instance>,
    active: bool,
}

/// Ordered set of configured instances and the user's filter selection.
#[derive(Debug)]
pub struct InstanceRegistry {
    entries: Vec<Entry>,
    filter: InstanceFilter,
}

impl InstanceRegistry {
    pub fn load(defs: &[InstanceDef]) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(defs.len());

        for (index, def) in defs.iter().enumerate() {
            for (field, value) in [("name", &def.name), ("url", &def.url), ("apiKey", &def.api_key)] {
                if value.is_empty() {
                    return Err(ConfigError::EmptyField { index, field });
                }
            }
            entries.push(Entry {
                instance: Arc::new(Instance {
                    index,
                    ..Instance::new(&def.name, &def.url, &def.api_key)
                }),
                active: true,
            });
        }

        Ok(Self {
            entries,
            filter: InstanceFilter::All,
        })
    }

    /// Activates the instances matching `filter` and deactivates the rest.
    /// Returns how many instances are active afterwards.
    pub fn set_active_filter(&mut self, filter: InstanceFilter) -> usize {
        let mut active = 0;
        for entry in &mut self.entries {
            entry.active = filter.matches(&entry.instance);
            if entry.active {
                active += 1;
            }
        }

        // A name nobody has leaves every instance inactive; keep that.
        if active == 0 && !self.entries.is_empty() {
            warn!("filter {:?} matches no instance, nothing will be fetched", filter.to_string());
        }

        self.filter = filter;
        active
    }

    pub fn filter(&self) -> &InstanceFilter {
        &self.filter
    }

    pub fn active(&self) -> Vec<Arc<Instance>> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.instance.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<Instance>, bool)> {
        self.entries.iter().map(|e| (&e.instance, e.active))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, url: &str, key: &str) -> InstanceDef {
        InstanceDef {
            name: name.to_string(),
            url: url.to_string(),
            api_key: key.to_string(),
        }
    }

    fn three() -> InstanceRegistry {
        InstanceRegistry::load(&[
            def("A", "http://a", "k1"),
            def("B", "http://b", "k2"),
            def("C", "http://c", "k3"),
        ])
        .unwrap()
    }

    fn active_names(reg: &InstanceRegistry) -> Vec<String> {
        reg.active().iter().map(|i| i.name.clone()).collect()
    }

    #[test]
    fn load_keeps_order_and_cardinality() {
        let reg = three();
        assert_eq!(reg.iter().count(), 3);
        assert_eq!(active_names(&reg), ["A", "B", "C"]);
        assert_eq!(reg.filter(), &InstanceFilter::All);
    }

    #[test]
    fn load_rejects_any_empty_field() {
        let cases = [
            (def("", "http://a", "k"), "name"),
            (def("A", "", "k"), "url"),
            (def("A", "http://a", ""), "apiKey"),
        ];
        for (bad, expected) in cases {
            let err = InstanceRegistry::load(&[def("ok", "http://ok", "k"), bad]).unwrap_err();
            match err {
                ConfigError::EmptyField { index, field } => {
                    assert_eq!(index, 1);
                    assert_eq!(field, expected);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn named_filter_keeps_only_that_instance() {
        let mut reg = three();
        assert_eq!(reg.set_active_filter(InstanceFilter::parse("B")), 1);
        assert_eq!(active_names(&reg), ["B"]);
        assert_eq!(reg.filter(), &InstanceFilter::Named("B".to_string()));
    }

    #[test]
    fn all_reactivates_everything() {
        let mut reg = three();
        reg.set_active_filter(InstanceFilter::parse("C"));
        assert_eq!(reg.set_active_filter(InstanceFilter::parse("All")), 3);
        assert_eq!(active_names(&reg), ["A", "B", "C"]);

    }

    #[test]
    fn whitespace_fields_are_accepted() {
        let reg = InstanceRegistry::load(&[def("A", "http://a", " ")]).unwrap();
        assert_eq!(reg.active()[0].api_key(), " ");
    }

    #[test]
    fn lowercase_all_is_an_instance_name() {
        let mut reg = InstanceRegistry::load(&[
            def("all", "http://lower", "k1"),
            def("ALL", "http://upper", "k2"),
        ])
        .unwrap();

        assert_eq!(InstanceFilter::parse("all"), InstanceFilter::Named("all".to_string()));
        assert_eq!(reg.set_active_filter(InstanceFilter::parse("all")), 1);
        assert_eq!(active_names(&reg), ["all"]);
        assert_eq!(reg.set_active_filter(InstanceFilter::parse("All")), 2);
    }

    #[test]
    fn load_numbers_instances_in_order() {
        let reg = InstanceRegistry::load(&[def("A", "http://a1", "k1"), def("A", "http://a2", "k2")])
            .unwrap();
        let indexes: Vec<_> = reg.iter().map(|(i, _)| (i.index, i.url.clone())).collect();
        assert_eq!(indexes, [(0, "http://a1".to_string()), (1, "http://a2".to_string())]);
    }

    #[test]
    fn unknown_name_deactivates_everything() {
        let mut reg = three();
        assert_eq!(reg.set_active_filter(InstanceFilter::parse("nope")), 0);
        assert!(reg.active().is_empty());
        assert!(reg.iter().all(|(_, active)| !active));
    }

    #[test]
    fn duplicate_names_are_all_selected() {
        let mut reg = InstanceRegistry::load(&[
            def("A", "http://a1", "k1"),
            def("A", "http://a2", "k2"),
            def("B", "http://b", "k3"),
        ])
        .unwrap();
        assert_eq!(reg.set_active_filter(InstanceFilter::parse("A")), 2);
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let inst = Instance::new("A", "http://a/", "k");
        assert_eq!(inst.endpoint("/api/stacks"), "http://a/api/stacks");
    }

    #[test]
    fn debug_output_hides_the_key() {
        let inst = Instance::new("A", "http://a", "super-secret");
        let out = format!("{inst:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("<redacted>"));
    }
}
