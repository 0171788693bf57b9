//! Dispatcher configuration.

use std::time::Duration;

/// Settings for side-effect dispatch.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on a single collaborator call.
    pub call_timeout: Duration,
    /// Number of effects that may wait in the queue before new ones are dropped.
    pub queue_capacity: usize,
    /// When false, notifications are skipped at handoff.
    pub notifications_enabled: bool,
    /// When false, stock adjustments are skipped at handoff.
    pub stock_adjustment_enabled: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            queue_capacity: 1024,
            notifications_enabled: true,
            stock_adjustment_enabled: true,
        }
    }
}
