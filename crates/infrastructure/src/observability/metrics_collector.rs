//! Metrics collector for the inventory pipeline
//!
//! 指标通过 `metrics` 门面记录，未安装导出器时所有调用都是空操作。

use metrics::{counter, gauge, histogram, Counter, Histogram};

/// Metrics collector for the inventory pipeline
#[derive(Clone)]
pub struct MetricsCollector {
    scheduling_cycles_total: Counter,
    scheduling_cycle_duration: Histogram,
    fetch_duration: Histogram,
    fetch_retries_total: Counter,
    unknown_payloads_total: Counter,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            scheduling_cycles_total: counter!("inventory_scheduling_cycles_total"),
            scheduling_cycle_duration: histogram!("inventory_scheduling_cycle_duration_seconds"),
            fetch_duration: histogram!("inventory_fetch_duration_seconds"),
            fetch_retries_total: counter!("inventory_fetch_retries_total"),
            unknown_payloads_total: counter!("inventory_unknown_payloads_total"),
        }
    }

    // Scheduler metrics

    pub fn record_scheduling_cycle(&self, links: usize, duration_seconds: f64) {
        self.scheduling_cycles_total.increment(1);
        self.scheduling_cycle_duration.record(duration_seconds);
        gauge!("inventory_due_links").set(links as f64);
    }

    pub fn record_work_enqueued(&self, source_type: &str, count: u64) {
        counter!("inventory_work_items_enqueued_total", "source_type" => source_type.to_string())
            .increment(count);
    }

    // Fetcher metrics

    pub fn record_page_fetched(&self, source_type: &str, duration_seconds: f64) {
        counter!("inventory_pages_fetched_total", "source_type" => source_type.to_string())
            .increment(1);
        self.fetch_duration.record(duration_seconds);
    }

    pub fn record_fetch_retry(&self) {
        self.fetch_retries_total.increment(1);
    }

    pub fn record_fetch_failure(&self, source_type: &str, error_kind: &'static str) {
        counter!(
            "inventory_fetch_failures_total",
            "source_type" => source_type.to_string(),
            "error" => error_kind
        )
        .increment(1);
    }

    // Merge engine metrics

    pub fn record_unknown_payload(&self) {
        self.unknown_payloads_total.increment(1);
    }

    /// `outcome` 取值 insert / update / unchanged / failed
    pub fn record_host_outcome(&self, source_type: &str, outcome: &'static str) {
        counter!(
            "inventory_hosts_total",
            "source_type" => source_type.to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }

    pub fn update_queue_depth(&self, queue: &str, depth: usize) {
        gauge!("inventory_queue_depth", "queue" => queue.to_string()).set(depth as f64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
