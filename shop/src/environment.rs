//! Injected dependencies of the shop reducer.

use crate::alerts::AlertPolicy;
use crate::config::ShopConfig;
use crate::notifier::Notifier;
use crate::persistence::{Persistence, WriteGate};
use sabalitos_core::environment::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Environment dependencies for the shop reducer
#[derive(Clone)]
pub struct ShopEnvironment {
    /// Clock for sale timestamps and alert cooldowns
    pub clock: Arc<dyn Clock>,
    /// Where the catalog and ledger are stored
    pub persistence: Arc<dyn Persistence>,
    /// Orders writes and clears on `persistence`
    pub writes: Arc<WriteGate>,
    /// Where stock notifications go
    pub notifier: Arc<dyn Notifier>,
    /// Quiet period before a changed blob is written
    pub save_debounce: Duration,
    /// How long operator feedback stays visible
    pub feedback_duration: Duration,
    /// Alert thresholds and cooldown
    pub alert_policy: AlertPolicy,
}

impl ShopEnvironment {
    /// Creates an environment with the default timings and thresholds
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        persistence: Arc<dyn Persistence>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::from_config(&ShopConfig::default(), clock, persistence, notifier)
    }

    /// Creates an environment using the timings and thresholds in `config`
    #[must_use]
    pub fn from_config(
        config: &ShopConfig,
        clock: Arc<dyn Clock>,
        persistence: Arc<dyn Persistence>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            persistence,
            writes: Arc::new(WriteGate::new()),
            notifier,
            save_debounce: config.save_debounce(),
            feedback_duration: config.feedback_duration(),
            alert_policy: config.alert_policy(),
        }
    }

    /// Overrides the save debounce
    #[must_use]
    pub fn with_save_debounce(mut self, save_debounce: Duration) -> Self {
        self.save_debounce = save_debounce;
        self
    }
}

impl std::fmt::Debug for ShopEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopEnvironment")
            .field("save_debounce", &self.save_debounce)
            .field("feedback_duration", &self.feedback_duration)
            .field("alert_policy", &self.alert_policy)
            .finish_non_exhaustive()
    }
}
