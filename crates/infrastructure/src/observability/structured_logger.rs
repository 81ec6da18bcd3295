//! Structured logging utilities
//!
//! 管道中的关键事件统一带上 `event` 字段，便于 JSON 日志检索。

use inventory_core::{InventoryError, LinkRecord, MergeKind, WorkItem};
use tracing::{debug, error, info, warn};

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_link_scheduled(link: &LinkRecord, pages: u32) {
        info!(
            event = "link_scheduled",
            link.source_type = %link.source_type,
            link.endpoint = %link.endpoint,
            link.last_checked = %link.last_checked,
            pages = pages,
            "已为数据源生成分页抓取任务"
        );
    }

    pub fn log_link_deferred(link: &LinkRecord, queue_depth: usize) {
        warn!(
            event = "link_deferred",
            link.source_type = %link.source_type,
            queue_depth = queue_depth,
            "工作队列空位不足，链接留待下个周期"
        );
    }

    pub fn log_placeholder_endpoint(link: &LinkRecord) {
        warn!(
            event = "placeholder_endpoint",
            link.source_type = %link.source_type,
            link.endpoint = %link.endpoint,
            "数据源地址仍为占位地址，请配置真实地址"
        );
    }

    pub fn log_scheduling_failed(error: &InventoryError) {
        error!(
            event = "scheduling_failed",
            error = %error,
            "调度周期失败，将在下个周期重试"
        );
    }

    pub fn log_fetch_retry(item: &WorkItem, attempt: u32, delay_ms: u64, error: &InventoryError) {
        warn!(
            event = "fetch_retry",
            work.source_type = %item.source_type,
            work.endpoint = %item.endpoint,
            work.page_offset = item.page_offset,
            attempt = attempt,
            delay_ms = delay_ms,
            error = %error,
            "抓取失败，准备重试"
        );
    }

    pub fn log_fetch_dropped(item: &WorkItem, error: &InventoryError) {
        error!(
            event = "fetch_dropped",
            work.source_type = %item.source_type,
            work.endpoint = %item.endpoint,
            work.page_offset = item.page_offset,
            error = %error,
            "抓取失败，丢弃工作项"
        );
    }

    pub fn log_fetch_cancelled(item: &WorkItem) {
        warn!(
            event = "fetch_cancelled",
            work.source_type = %item.source_type,
            work.endpoint = %item.endpoint,
            work.page_offset = item.page_offset,
            "收到关闭信号，丢弃进行中的工作项"
        );
    }

    pub fn log_empty_page(item: &WorkItem) {
        debug!(
            event = "empty_page",
            work.source_type = %item.source_type,
            work.page_offset = item.page_offset,
            "数据源返回空页"
        );
    }

    pub fn log_unknown_source(source_type: &str) {
        error!(
            event = "unknown_source_type",
            source_type = source_type,
            "没有对应的归一化器，丢弃原始数据"
        );
    }

    pub fn log_page_fetched(item: &WorkItem, records: usize) {
        debug!(
            event = "page_fetched",
            work.source_type = %item.source_type,
            work.page_offset = item.page_offset,
            records = records,
            "分页数据已放入合并队列"
        );
    }

    pub fn log_host_outcome(host: &str, kind: MergeKind) {
        let event = match kind {
            MergeKind::Insert => "host_inserted",
            MergeKind::Update => "host_merged",
            MergeKind::Unchanged => "host_unchanged",
        };
        debug!(
            event = event,
            host = host,
            outcome = kind.as_str(),
            "主机记录已处理"
        );
    }

    pub fn log_host_failed(host: &str, error: &InventoryError) {
        error!(
            event = "host_persist_failed",
            host = host,
            error = %error,
            "主机记录写入失败"
        );
    }

    pub fn log_queue_depths(depths: &[(&str, usize)]) {
        for (queue, depth) in depths {
            info!(
                event = "queue_depth",
                queue = *queue,
                depth = *depth,
                "队列剩余元素"
            );
        }
    }
}
