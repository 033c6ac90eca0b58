//! Plugin contract definitions
//!
//! A conforming plugin is a shell script that exposes a known set of
//! functions. The contract is three disjoint capability sets: functions a
//! plugin must expose, functions it may expose, and functions it must no
//! longer expose.

#![allow(dead_code)] // membership queries are part of the contract surface

pub mod validator;

/// Functions every plugin must expose
pub const MANDATORY: &[&str] = &["plugin_render", "plugin_interval"];

/// Functions a plugin may expose
pub const OPTIONAL: &[&str] = &["plugin_options", "plugin_health", "plugin_click"];

/// Functions removed from the contract; their presence is flagged
pub const DEPRECATED: &[&str] = &["plugin_color", "plugin_legacy_render"];

/// Improvement suggestions emitted when an optional capability is absent
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "plugin_options",
        "implement plugin_options to declare configurable options for better configurability",
    ),
    (
        "plugin_health",
        "implement plugin_health so the renderer can color the segment from plugin state",
    ),
    ("plugin_click", "implement plugin_click to support click actions on the segment"),
];

/// The capability sets a plugin unit is checked against.
///
/// Sets are passed around explicitly rather than consulted as ambient
/// statics so tests can validate against reduced contracts.
#[derive(Debug, Clone)]
pub struct Contract {
    pub mandatory: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub deprecated: &'static [&'static str],
}

impl Default for Contract {
    fn default() -> Self {
        Self {
            mandatory: MANDATORY,
            optional: OPTIONAL,
            deprecated: DEPRECATED,
        }
    }
}

impl Contract {
    pub fn standard() -> Self {
        Self::default()
    }

    /// Linear scans are fine here: the sets stay under ten entries and are
    /// queried once per validation, not per render tick.
    pub fn is_mandatory(&self, name: &str) -> bool {
        self.mandatory.contains(&name)
    }

    pub fn is_optional(&self, name: &str) -> bool {
        self.optional.contains(&name)
    }

    pub fn is_deprecated(&self, name: &str) -> bool {
        self.deprecated.contains(&name)
    }

    /// Suggestion text for an absent optional capability
    pub fn suggestion_for(&self, name: &str) -> Option<&'static str> {
        SUGGESTIONS.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
    }
}
