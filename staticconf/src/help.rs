//! # Configuration Help
//!
//! Collects a description of every declared accessor so applications can
//! print what configuration they expect.

use crate::namespace::DEFAULT;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Rendering of an absent default.
pub const UNDEFINED: &str = "<Undefined>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescription {
    pub name: String,
    pub type_name: String,
    pub default: Option<String>,
    pub help: Option<String>,
}

impl KeyDescription {
    fn render(&self) -> String {
        format!(
            "{} (Type: {}, Default: {})\n{}",
            self.name,
            self.type_name,
            self.default.as_deref().unwrap_or(UNDEFINED),
            self.help.as_deref().unwrap_or_default()
        )
    }
}

/// Descriptions grouped by namespace.
#[derive(Debug, Default)]
pub struct ConfigHelp {
    descriptions: Mutex<BTreeMap<String, Vec<KeyDescription>>>,
}

impl ConfigHelp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a description. Declaring the same accessor twice is recorded
    /// once.
    pub fn add(&self, namespace: &str, description: KeyDescription) {
        let mut descriptions = self.descriptions.lock();
        let entries = descriptions.entry(namespace.to_string()).or_default();
        if !entries.contains(&description) {
            entries.push(description);
        }
    }

    /// Render every description. The default namespace comes first, the
    /// others follow alphabetically; entries are sorted within a namespace.
    pub fn view_help(&self) -> String {
        let descriptions = self.descriptions.lock();
        let mut namespaces: Vec<(&String, &Vec<KeyDescription>)> = descriptions.iter().collect();
        namespaces.sort_by(|(a, _), (b, _)| {
            (a.as_str() != DEFAULT, a.as_str()).cmp(&(b.as_str() != DEFAULT, b.as_str()))
        });

        namespaces
            .into_iter()
            .map(|(name, entries)| {
                let mut rendered: Vec<String> = entries.iter().map(KeyDescription::render).collect();
                rendered.sort();
                format!("\nNamespace: {}\n{}", name, rendered.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&self) {
        self.descriptions.lock().clear();
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<KeyDescription>> {
        self.descriptions.lock().clone()
    }

    pub fn restore(&self, snapshot: BTreeMap<String, Vec<KeyDescription>>) {
        *self.descriptions.lock() = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(name: &str, type_name: &str, default: Option<&str>, help: Option<&str>) -> KeyDescription {
        KeyDescription {
            name: name.to_string(),
            type_name: type_name.to_string(),
            default: default.map(str::to_string),
            help: help.map(str::to_string),
        }
    }

    #[test]
    fn test_view_help_layout() {
        let help = ConfigHelp::new();
        help.add("Beta", describe("one", "int", None, Some("The one")));
        help.add(DEFAULT, describe("when", "time", Some("NOW"), Some("The time")));
        help.add(DEFAULT, describe("age", "int", Some("999"), Some("Your age")));
        help.add("Alpha", describe("bar", "string", Some("empty"), Some("A bar")));

        let output = help.view_help();
        let lines: Vec<&str> = output.split('\n').collect();

        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "Namespace: DEFAULT");
        assert_eq!(lines[2], "age (Type: int, Default: 999)");
        assert_eq!(lines[3], "Your age");
        assert_eq!(lines[4], "when (Type: time, Default: NOW)");
        assert_eq!(lines[5], "The time");
        assert_eq!(lines[7], "Namespace: Alpha");
        assert_eq!(lines[8], "bar (Type: string, Default: empty)");
        assert_eq!(lines[11], "Namespace: Beta");
        assert_eq!(lines[12], "one (Type: int, Default: <Undefined>)");
        assert_eq!(lines[13], "The one");
    }

    #[test]
    fn test_add_is_idempotent() {
        let help = ConfigHelp::new();
        help.add(DEFAULT, describe("a", "int", None, None));
        help.add(DEFAULT, describe("a", "int", None, None));

        assert_eq!(help.snapshot()[DEFAULT].len(), 1);
        assert_eq!(help.view_help(), "\nNamespace: DEFAULT\na (Type: int, Default: <Undefined>)\n");
    }
}
