//! Per-query-name polling policies

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::api::queries;

/// Auto-refresh policy for one query name. A zero interval disables polling.
///
/// Attached per name rather than per key, so every parameterization of the
/// same logical query shares one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub interval: Duration,
}

impl PollingPolicy {
    pub const DISABLED: Self = Self {
        interval: Duration::ZERO,
    };

    pub fn every(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

/// Central table of polling policies, set once at client construction.
#[derive(Debug, Clone, Default)]
pub struct PollingTable {
    policies: HashMap<String, PollingPolicy>,
}

impl PollingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, name: impl Into<String>, policy: PollingPolicy) -> Self {
        self.policies.insert(name.into(), policy);
        self
    }

    /// Policy for a query name; names without an entry never auto-refresh.
    pub fn policy(&self, name: &str) -> PollingPolicy {
        self.policies
            .get(name)
            .copied()
            .unwrap_or(PollingPolicy::DISABLED)
    }

    /// The intervals the dashboard uses: attendance views poll, the student
    /// roster refreshes only through invalidation or explicit refresh.
    pub fn dashboard_defaults() -> Self {
        Self::new()
            .with_policy(
                queries::ATTENDANCE_STATS,
                PollingPolicy::every(Duration::from_secs(30)),
            )
            .with_policy(
                queries::TODAY_ATTENDANCE,
                PollingPolicy::every(Duration::from_secs(30)),
            )
            .with_policy(
                queries::ATTENDANCE_HISTORY,
                PollingPolicy::every(Duration::from_secs(60)),
            )
    }
}
