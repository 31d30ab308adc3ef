use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Running counters for one [`LayoutContext`](crate::LayoutContext).
#[derive(Debug, Default, Clone)]
pub struct LayoutMetrics {
    styles_created: u64,
    styles_released: u64,
    nodes_created: u64,
    nodes_released: u64,
    mutations: u64,
    layouts: u64,
    measure_calls: u64,
    decoded_nodes: u64,
}

impl LayoutMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_style_created(&mut self) {
        self.styles_created = self.styles_created.saturating_add(1);
    }

    pub fn record_style_released(&mut self) {
        self.styles_released = self.styles_released.saturating_add(1);
    }

    pub fn record_node_created(&mut self) {
        self.nodes_created = self.nodes_created.saturating_add(1);
    }

    pub fn record_node_released(&mut self) {
        self.nodes_released = self.nodes_released.saturating_add(1);
    }

    pub fn record_mutation(&mut self) {
        self.mutations = self.mutations.saturating_add(1);
    }

    pub fn record_layout(&mut self, decoded: usize) {
        self.layouts = self.layouts.saturating_add(1);
        self.decoded_nodes = self.decoded_nodes.saturating_add(decoded as u64);
    }

    pub fn record_measure_call(&mut self) {
        self.measure_calls = self.measure_calls.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            styles_created: self.styles_created,
            styles_released: self.styles_released,
            nodes_created: self.nodes_created,
            nodes_released: self.nodes_released,
            mutations: self.mutations,
            layouts: self.layouts,
            measure_calls: self.measure_calls,
            decoded_nodes: self.decoded_nodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub styles_created: u64,
    pub styles_released: u64,
    pub nodes_created: u64,
    pub nodes_released: u64,
    pub mutations: u64,
    pub layouts: u64,
    pub measure_calls: u64,
    pub decoded_nodes: u64,
}

impl MetricSnapshot {
    /// Nodes created and not yet released.
    pub fn live_nodes(&self) -> u64 {
        self.nodes_created.saturating_sub(self.nodes_released)
    }

    pub fn live_styles(&self) -> u64 {
        self.styles_created.saturating_sub(self.styles_released)
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "layout_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("styles_created".to_string(), json!(self.styles_created));
        map.insert("styles_released".to_string(), json!(self.styles_released));
        map.insert("nodes_created".to_string(), json!(self.nodes_created));
        map.insert("nodes_released".to_string(), json!(self.nodes_released));
        map.insert("mutations".to_string(), json!(self.mutations));
        map.insert("layouts".to_string(), json!(self.layouts));
        map.insert("measure_calls".to_string(), json!(self.measure_calls));
        map.insert("decoded_nodes".to_string(), json!(self.decoded_nodes));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let mut metrics = LayoutMetrics::new();
        metrics.record_node_created();
        metrics.record_node_created();
        metrics.record_node_released();
        metrics.record_style_created();
        metrics.record_layout(2);
        metrics.record_measure_call();

        let snapshot = metrics.snapshot(Duration::from_millis(15));
        assert_eq!(snapshot.uptime_ms, 15);
        assert_eq!(snapshot.live_nodes(), 1);
        assert_eq!(snapshot.live_styles(), 1);
        assert_eq!(snapshot.layouts, 1);
        assert_eq!(snapshot.decoded_nodes, 2);
        assert_eq!(snapshot.measure_calls, 1);
    }

    #[test]
    fn log_event_carries_fields() {
        let snapshot = LayoutMetrics::new().snapshot(Duration::ZERO);
        let event = snapshot.to_log_event("flexnode::metrics");
        assert_eq!(event.message, "layout_metrics");
        assert_eq!(event.fields.len(), 9);
        assert_eq!(event.fields["layouts"], json!(0));
    }
}
