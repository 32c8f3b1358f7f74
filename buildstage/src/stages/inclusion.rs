//! Sub-stage inclusion filter.
//!
//! A sub-stage runs when it is declared by the stage, selected by `only`
//! (or `only` is empty) and not named by `without`.

use crate::params::SubStageSelection;

/// The three inputs of an inclusion decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusionDecision {
    /// The name is declared by the stage and has a body.
    pub handler_exists: bool,
    /// `only` is empty or selects the name.
    pub include: bool,
    /// `without` selects the name.
    pub exclude: bool,
}

impl InclusionDecision {
    /// Evaluates the filter for `name`.
    #[must_use]
    pub fn evaluate(
        name: &str,
        declared: &[&str],
        only: &SubStageSelection,
        without: &SubStageSelection,
    ) -> Self {
        if !declared.contains(&name) {
            return Self {
                handler_exists: false,
                include: false,
                exclude: false,
            };
        }
        let include = only.is_empty() || only.equals(name) || only.contains(name);
        let exclude = !without.is_empty() && (without.equals(name) || without.contains(name));
        Self {
            handler_exists: true,
            include,
            exclude,
        }
    }

    /// The final answer.
    #[must_use]
    pub fn included(&self) -> bool {
        self.include && !self.exclude && self.handler_exists
    }

    /// Short explanation for debug output.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        if !self.handler_exists {
            "not runnable"
        } else if !self.include {
            "not selected by only"
        } else if self.exclude {
            "excluded by without"
        } else {
            "included"
        }
    }
}

/// Returns true if `name` should run.
#[must_use]
pub fn is_included(
    name: &str,
    declared: &[&str],
    only: &SubStageSelection,
    without: &SubStageSelection,
) -> bool {
    InclusionDecision::evaluate(name, declared, only, without).included()
}
