use std::sync::Arc;

use chrono::Utc;
use inventory_core::{
    HostRecord, HostRepository, InventoryError, InventoryResult, MergeKind, RawPayload,
};
use inventory_domain::{reconcile, MergeOutcome, NormalizerRegistry};
use inventory_infrastructure::{MetricsCollector, StructuredLogger, WorkQueue};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::host_lock::HostLocks;

/// 一份原始数据的合并统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl MergeSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.failed
    }

    fn add(&mut self, kind: MergeKind) {
        match kind {
            MergeKind::Insert => self.inserted += 1,
            MergeKind::Update => self.updated += 1,
            MergeKind::Unchanged => self.unchanged += 1,
        }
    }
}

/// 合并引擎
///
/// 把原始数据归一化为主机记录，再与存储中的候选记录比对：
/// 没有候选则插入，指纹相同则跳过，否则合并后更新。
/// 单条记录失败只影响该记录。
#[derive(Clone)]
pub struct MergeEngine {
    registry: NormalizerRegistry,
    hosts: Arc<dyn HostRepository>,
    payload_queue: WorkQueue<RawPayload>,
    locks: Arc<HostLocks>,
    metrics: MetricsCollector,
}

impl MergeEngine {
    pub fn new(
        registry: NormalizerRegistry,
        hosts: Arc<dyn HostRepository>,
        payload_queue: WorkQueue<RawPayload>,
        locks: Arc<HostLocks>,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            registry,
            hosts,
            payload_queue,
            locks,
            metrics,
        }
    }

    /// 处理一份原始数据
    ///
    /// 未知数据源类型的数据被记录并丢弃，不写入任何记录。
    pub async fn process(&self, payload: RawPayload) -> MergeSummary {
        let mut summary = MergeSummary::default();

        let records = match self.registry.normalize(&payload, Utc::now()) {
            Ok(records) => records,
            Err(InventoryError::UnknownSourceType(source_type)) => {
                StructuredLogger::log_unknown_source(&source_type);
                self.metrics.record_unknown_payload();
                return summary;
            }
            Err(e) => {
                warn!("归一化失败 {}: {}", payload.source_type, e);
                return summary;
            }
        };

        for record in records {
            let host = record.describe();
            match self.merge_record(record).await {
                Ok(kind) => {
                    StructuredLogger::log_host_outcome(&host, kind);
                    self.metrics
                        .record_host_outcome(&payload.source_type, kind.as_str());
                    summary.add(kind);
                }
                Err(e) => {
                    StructuredLogger::log_host_failed(&host, &e);
                    self.metrics
                        .record_host_outcome(&payload.source_type, "failed");
                    summary.failed += 1;
                }
            }
        }

        debug!(
            "合并完成 {}: 插入 {} 更新 {} 未变化 {} 失败 {}",
            payload.source_type, summary.inserted, summary.updated, summary.unchanged, summary.failed
        );
        summary
    }

    /// 合并一条记录，同一 `host_name` 的读-改-写串行执行
    pub async fn merge_record(&self, record: HostRecord) -> InventoryResult<MergeKind> {
        let _guard = self
            .locks
            .lock(record.host_name.as_deref().unwrap_or(""))
            .await;

        let existing = self
            .hosts
            .find_by_host_and_external_ip(
                record.host_name.as_deref(),
                record.external_ip.as_deref(),
            )
            .await?;

        let outcome = reconcile(existing, record);
        let kind = outcome.kind();
        match outcome {
            MergeOutcome::Insert(record) => self.hosts.insert(&record).await?,
            MergeOutcome::Unchanged => {}
            MergeOutcome::Update(record) => {
                if !self.hosts.update_by_host_name(&record).await? {
                    warn!("待更新的主机记录已不存在，改为插入: {}", record.describe());
                    self.hosts.insert(&record).await?;
                }
            }
        }
        Ok(kind)
    }

    /// 合并循环，直到收到关闭信号或队列关闭
    ///
    /// 已取出的原始数据总会处理完毕后再检查关闭信号。
    pub async fn run(
        &self,
        worker_id: usize,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> InventoryResult<()> {
        info!("合并器 {} 已启动", worker_id);

        loop {
            let payload = tokio::select! {
                payload = self.payload_queue.pop() => payload,
                _ = shutdown_rx.recv() => break,
            };
            let Some(payload) = payload else {
                break;
            };
            self.process(payload).await;
        }

        info!("合并器 {} 已停止", worker_id);
        Ok(())
    }
}
