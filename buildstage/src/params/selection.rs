//! `only` / `without` sub-stage selections.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sub-stage selection as supplied on the command line or in parameters.
///
/// Selections come either as a single name or as a list. A single name is
/// compared by equality and also treated as a one-element set; a list is
/// tested by membership. Both forms are accepted everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubStageSelection {
    /// Nothing selected.
    #[default]
    Unset,
    /// A single sub-stage name.
    One(String),
    /// A list of sub-stage names.
    Many(Vec<String>),
}

impl SubStageSelection {
    /// Builds a selection from a list of values, keeping the single-name form
    /// when exactly one value is given.
    #[must_use]
    pub fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => Self::Unset,
            1 => Self::One(values.remove(0)),
            _ => Self::Many(values),
        }
    }

    /// Parses a comma separated list (`"ts,scss"`), ignoring blank entries.
    #[must_use]
    pub fn parse_list(raw: &str) -> Self {
        Self::from_values(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
        )
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Unset => true,
            Self::One(name) => name.is_empty(),
            Self::Many(names) => names.is_empty(),
        }
    }

    /// Direct equality with a single-name selection.
    #[must_use]
    pub fn equals(&self, name: &str) -> bool {
        matches!(self, Self::One(selected) if selected == name)
    }

    /// Membership test; a single name acts as a one-element set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::Unset => false,
            Self::One(selected) => std::slice::from_ref(selected).iter().any(|s| s == name),
            Self::Many(selected) => selected.iter().any(|s| s == name),
        }
    }

    /// Returns true if `name` is selected by either check.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.equals(name) || self.contains(name)
    }

    /// Returns the selected names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Unset => Vec::new(),
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for SubStageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "<unset>"),
            Self::One(name) => write!(f, "{name}"),
            Self::Many(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

impl From<&str> for SubStageSelection {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<String> for SubStageSelection {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for SubStageSelection {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<Vec<&str>> for SubStageSelection {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(ToString::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SubStageSelection {
    fn from(names: [&str; N]) -> Self {
        Self::Many(names.iter().map(ToString::to_string).collect())
    }
}
