use std::sync::Arc;
use std::time::{Duration, Instant};

use inventory_core::{
    FetcherConfig, InventoryError, InventoryResult, RawPayload, SourceClient, WorkItem,
};
use inventory_domain::records_in_body;
use inventory_infrastructure::{MetricsCollector, StructuredLogger, WorkQueue};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// 单次重试的最大等待时间
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// 抓取池中的工作者
///
/// 每个工作项只发出一个分页请求。临时性失败按指数退避重试，
/// 永久失败或重试耗尽时记录完整工作项后丢弃。
pub struct PageFetcher {
    client: Arc<dyn SourceClient>,
    work_queue: WorkQueue<WorkItem>,
    payload_queue: WorkQueue<RawPayload>,
    max_retries: u32,
    retry_base_delay: Duration,
    metrics: MetricsCollector,
}

/// 单个工作项的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 原始数据已放入合并队列
    Delivered,
    /// 数据源返回空页
    Empty,
    /// 失败并已丢弃
    Dropped,
}

impl PageFetcher {
    pub fn new(
        client: Arc<dyn SourceClient>,
        work_queue: WorkQueue<WorkItem>,
        payload_queue: WorkQueue<RawPayload>,
        config: &FetcherConfig,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            client,
            work_queue,
            payload_queue,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            metrics,
        }
    }

    /// 第 `attempt` 次重试前的等待时间：`base * 2^(attempt-1)`，叠加至多 25% 的随机抖动
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_BACKOFF);
        let jitter = exponential.mul_f64(rand::random::<f64>() * 0.25);
        exponential + jitter
    }

    /// 请求一页数据，临时性失败时重试
    pub async fn fetch_with_retry(&self, item: &WorkItem) -> InventoryResult<Value> {
        let mut attempt = 0;
        loop {
            let start_time = Instant::now();
            match self.client.fetch_page(item).await {
                Ok(body) => {
                    self.metrics
                        .record_page_fetched(&item.source_type, start_time.elapsed().as_secs_f64());
                    return Ok(body);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    StructuredLogger::log_fetch_retry(item, attempt, delay.as_millis() as u64, &e);
                    self.metrics.record_fetch_retry();
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 处理一个工作项
    ///
    /// 抓取失败不会向上返回，只有合并队列关闭时返回错误。
    pub async fn process(&self, item: &WorkItem) -> InventoryResult<FetchOutcome> {
        let body = match self.fetch_with_retry(item).await {
            Ok(body) => body,
            Err(e) => {
                StructuredLogger::log_fetch_dropped(item, &e);
                self.metrics
                    .record_fetch_failure(&item.source_type, error_kind(&e));
                return Ok(FetchOutcome::Dropped);
            }
        };

        let records = records_in_body(&body).len();
        if records == 0 {
            StructuredLogger::log_empty_page(item);
            return Ok(FetchOutcome::Empty);
        }

        self.payload_queue
            .push(RawPayload::new(item.source_type.clone(), body))
            .await?;
        StructuredLogger::log_page_fetched(item, records);
        Ok(FetchOutcome::Delivered)
    }

    /// 抓取循环，直到收到关闭信号
    ///
    /// 请求进行中收到关闭信号时，记录被丢弃的工作项后退出。
    pub async fn run(
        &self,
        worker_id: usize,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> InventoryResult<()> {
        info!("抓取器 {} 已启动", worker_id);

        loop {
            let item = tokio::select! {
                item = self.work_queue.pop() => item,
                _ = shutdown_rx.recv() => break,
            };
            let Some(item) = item else {
                break;
            };

            tokio::select! {
                result = self.process(&item) => {
                    let outcome = result?;
                    debug!(
                        "抓取器 {} 完成工作项: {} 第 {} 页 ({:?})",
                        worker_id, item.source_type, item.page_offset, outcome
                    );
                }
                _ = shutdown_rx.recv() => {
                    StructuredLogger::log_fetch_cancelled(&item);
                    break;
                }
            }
        }

        info!("抓取器 {} 已停止", worker_id);
        Ok(())
    }
}

fn error_kind(error: &InventoryError) -> &'static str {
    match error {
        InventoryError::Network(_) => "network",
        InventoryError::UpstreamStatus { .. } => "status",
        InventoryError::Serialization(_) => "serialization",
        InventoryError::Configuration(_) => "configuration",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_testing_utils::MockSourceClient;
    use serde_json::json;

    const ENDPOINT: &str = "https://scan.example.com/hosts";

    fn fetcher(client: MockSourceClient, max_retries: u32) -> (PageFetcher, WorkQueue<RawPayload>) {
        let payloads = WorkQueue::new("payload", 16);
        let config = FetcherConfig {
            max_retries,
            retry_base_delay_ms: 1,
            ..FetcherConfig::default()
        };
        let fetcher = PageFetcher::new(
            Arc::new(client),
            WorkQueue::new("fetch", 16),
            payloads.clone(),
            &config,
            MetricsCollector::new(),
        );
        (fetcher, payloads)
    }

    fn item(page_offset: u32) -> WorkItem {
        WorkItem {
            source_type: "qualys".to_string(),
            endpoint: ENDPOINT.to_string(),
            page_offset,
        }
    }

    fn unavailable() -> InventoryError {
        InventoryError::UpstreamStatus {
            status: 503,
            endpoint: ENDPOINT.to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_page_is_delivered() {
        let client = MockSourceClient::new();
        client.set_page(ENDPOINT, 1, json!([{"id": "1", "dnsHostName": "a"}]));
        let (fetcher, payloads) = fetcher(client, 0);

        assert_eq!(fetcher.process(&item(1)).await.unwrap(), FetchOutcome::Delivered);
        let payload = payloads.try_pop().unwrap();
        assert_eq!(payload.source_type, "qualys");
        assert_eq!(payload.body[0]["id"], "1");
    }

    #[tokio::test]
    async fn test_empty_page_produces_no_payload() {
        let client = MockSourceClient::new();
        client.set_page(ENDPOINT, 2, json!({"resources": []}));
        let (fetcher, payloads) = fetcher(client, 0);

        assert_eq!(fetcher.process(&item(2)).await.unwrap(), FetchOutcome::Empty);
        assert!(payloads.is_empty());
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let client = MockSourceClient::new();
        client.push_failure(ENDPOINT, 1, unavailable());
        client.push_failure(ENDPOINT, 1, InventoryError::Network("reset".into()));
        client.set_page(ENDPOINT, 1, json!([{"id": "1"}]));
        let (fetcher, payloads) = fetcher(client.clone(), 2);

        assert_eq!(fetcher.process(&item(1)).await.unwrap(), FetchOutcome::Delivered);
        assert_eq!(client.call_count(), 3);
        assert_eq!(payloads.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_drop_item() {
        let client = MockSourceClient::new();
        for _ in 0..3 {
            client.push_failure(ENDPOINT, 1, unavailable());
        }
        let (fetcher, payloads) = fetcher(client.clone(), 1);

        assert_eq!(fetcher.process(&item(1)).await.unwrap(), FetchOutcome::Dropped);
        assert_eq!(client.call_count(), 2);
        assert!(payloads.is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let client = MockSourceClient::new();
        client.push_failure(
            ENDPOINT,
            1,
            InventoryError::UpstreamStatus {
                status: 404,
                endpoint: ENDPOINT.to_string(),
            },
        );
        let (fetcher, _payloads) = fetcher(client.clone(), 5);

        assert_eq!(fetcher.process(&item(1)).await.unwrap(), FetchOutcome::Dropped);
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let config = FetcherConfig {
            retry_base_delay_ms: 100,
            ..FetcherConfig::default()
        };
        let fetcher = PageFetcher::new(
            Arc::new(MockSourceClient::new()),
            WorkQueue::new("fetch", 1),
            WorkQueue::new("payload", 1),
            &config,
            MetricsCollector::new(),
        );

        for (attempt, base_ms) in [(1, 100u64), (2, 200), (3, 400)] {
            let delay = fetcher.backoff_delay(attempt);
            assert!(delay >= Duration::from_millis(base_ms));
            assert!(delay <= Duration::from_millis(base_ms * 5 / 4));
        }
        assert!(fetcher.backoff_delay(30) <= MAX_BACKOFF.mul_f64(1.25));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_request() {
        let client = MockSourceClient::new().with_delay(Duration::from_secs(30));
        let (fetcher, payloads) = fetcher(client, 0);
        let fetcher = Arc::new(fetcher);
        fetcher.work_queue.push(item(1)).await.unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.run(0, shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(payloads.is_empty());
        assert!(fetcher.work_queue.is_empty());
    }
}
