//! Per-stage error policy for classification-backed stages
//!
//! Two failure classes are told apart: the service could not be reached or
//! refused the call (service error), or it answered with a payload that does
//! not decode (parse error). Each class maps to an [`ErrorAction`].

use crate::stages::Stage;
use tagtax_common::config::{ErrorAction, StagePolicyConfig, TomlConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub on_parse_error: ErrorAction,
    pub on_service_error: ErrorAction,
}

impl ErrorPolicy {
    pub const ABORT_ALL: ErrorPolicy = ErrorPolicy {
        on_parse_error: ErrorAction::Abort,
        on_service_error: ErrorAction::Abort,
    };

    pub const SKIP_ALL: ErrorPolicy = ErrorPolicy {
        on_parse_error: ErrorAction::Skip,
        on_service_error: ErrorAction::Skip,
    };

    /// Built-in policy
    ///
    /// Compound interpretation stops on any failure so a bad answer never
    /// silently drops a tag; bulk style enrichment logs and moves on.
    pub fn default_for(stage: Stage) -> Self {
        match stage {
            Stage::Interpret => Self::ABORT_ALL,
            _ => Self::SKIP_ALL,
        }
    }

    /// Built-in policy with any `[policy.<stage>]` values applied on top
    pub fn for_stage(stage: Stage, config: &TomlConfig) -> Self {
        let policy = Self::default_for(stage);
        match config.policy.get(stage.name()) {
            Some(overrides) => policy.with_overrides(overrides),
            None => policy,
        }
    }

    pub fn with_overrides(mut self, overrides: &StagePolicyConfig) -> Self {
        if let Some(action) = overrides.on_parse_error {
            self.on_parse_error = action;
        }
        if let Some(action) = overrides.on_service_error {
            self.on_service_error = action;
        }
        self
    }
}
