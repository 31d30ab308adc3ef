use std::sync::{Arc, Mutex};

use crate::logging::{Logger, TARGET_METRICS};
use crate::metrics::LayoutMetrics;

/// Settings applied when a [`LayoutContext`](crate::LayoutContext) is built.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Snap computed geometry to whole pixels.
    pub rounding: bool,
    /// Optional structured logger used by the context.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with the caller.
    pub metrics: Option<Arc<Mutex<LayoutMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rounding: true,
            logger: None,
            metrics: None,
            metrics_target: TARGET_METRICS.to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_rounding(mut self, rounding: bool) -> Self {
        self.rounding = rounding;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(LayoutMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<LayoutMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}
