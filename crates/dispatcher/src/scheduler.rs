use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use inventory_core::{InventoryResult, LinkRecord, LinkRepository, PipelineConfig, WorkItem};
use inventory_infrastructure::{MetricsCollector, StructuredLogger, WorkQueue};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// 一个调度周期的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// 已入队并标记检查时间的链接
    pub scheduled: Vec<LinkRecord>,
    /// 队列空位不足、保持到期状态的链接
    pub deferred: Vec<LinkRecord>,
}

/// 链接调度器
///
/// 每个周期认领所有到期链接，为每个链接生成 `1..=max_pages` 的分页工作项，
/// 在同一事务中更新 `last_checked` 后提交。
pub struct LinkScheduler {
    link_repo: Arc<dyn LinkRepository>,
    work_queue: WorkQueue<WorkItem>,
    max_pages: u32,
    refresh_interval: chrono::Duration,
    refresh_sleep: std::time::Duration,
    metrics: MetricsCollector,
}

impl LinkScheduler {
    pub fn new(
        link_repo: Arc<dyn LinkRepository>,
        work_queue: WorkQueue<WorkItem>,
        config: &PipelineConfig,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            link_repo,
            work_queue,
            max_pages: config.max_pages,
            refresh_interval: config.refresh_interval(),
            refresh_sleep: config.refresh_sleep(),
            metrics,
        }
    }

    /// 执行一个调度周期
    ///
    /// 认领事务内不等待队列空位：工作队列放不下某个链接的全部分页时，
    /// 该链接不入队也不标记，留待队列腾出空位后的下一个周期。
    /// 任何错误都会使整个认领回滚，链接保持到期状态。
    pub async fn scan_and_schedule(&self, now: DateTime<Utc>) -> InventoryResult<ScheduleReport> {
        let start_time = Instant::now();
        let mut claim = self
            .link_repo
            .claim_due_links(now, self.refresh_interval)
            .await?;

        let mut report = ScheduleReport::default();
        if claim.links().is_empty() {
            debug!("没有到期的数据源链接");
        }

        for link in claim.links().to_vec() {
            if link.has_placeholder_endpoint() {
                StructuredLogger::log_placeholder_endpoint(&link);
            }

            let items = (1..=self.max_pages)
                .map(|page_offset| WorkItem::for_link(&link, page_offset))
                .collect();
            if !self.work_queue.try_push_all(items)? {
                StructuredLogger::log_link_deferred(&link, self.work_queue.len());
                report.deferred.push(link);
                continue;
            }
            self.metrics
                .record_work_enqueued(&link.source_type, u64::from(self.max_pages));

            claim.mark_checked(&link.source_type, now).await?;
            StructuredLogger::log_link_scheduled(&link, self.max_pages);
            report.scheduled.push(link);
        }

        claim.commit().await?;

        self.metrics
            .record_scheduling_cycle(report.scheduled.len(), start_time.elapsed().as_secs_f64());
        self.metrics
            .update_queue_depth(self.work_queue.name(), self.work_queue.len());

        Ok(report)
    }

    /// 调度循环，直到收到关闭信号
    ///
    /// 单个周期失败只记录日志，下个周期重试。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> InventoryResult<()> {
        info!(
            "启动调度器，刷新间隔 {} 秒，每个链接 {} 页",
            self.refresh_interval.num_seconds(),
            self.max_pages
        );

        loop {
            tokio::select! {
                result = self.scan_and_schedule(Utc::now()) => {
                    match result {
                        Ok(report) if !report.deferred.is_empty() => {
                            info!(
                                "调度周期完成，调度 {} 个链接，{} 个链接等待队列空位",
                                report.scheduled.len(),
                                report.deferred.len()
                            );
                            // 在事务之外等待空位，随后立即开始下一个周期
                            tokio::select! {
                                result = self.work_queue.wait_for_capacity(self.max_pages as usize) => result?,
                                _ = shutdown_rx.recv() => break,
                            }
                            continue;
                        }
                        Ok(report) => info!("调度周期完成，共调度 {} 个链接", report.scheduled.len()),
                        Err(e) => StructuredLogger::log_scheduling_failed(&e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("调度器在调度周期中收到关闭信号，未提交的认领已回滚");
                    break;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.refresh_sleep) => {}
                _ = shutdown_rx.recv() => {
                    info!("调度器循环收到关闭信号");
                    break;
                }
            }
        }

        Ok(())
    }
}
