use serde::{Deserialize, Serialize};

/// 管道配置：三个工作池的规模、刷新间隔与分页上限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub producer_count: usize,
    pub fetcher_count: usize,
    pub serializer_count: usize,
    pub refresh_interval_seconds: u64,
    /// 每个链接的最大页数，页偏移取 `1..=max_pages`
    pub max_pages: u32,
    pub page_size: u32,
    pub queue_capacity: usize,
    pub shutdown_timeout_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producer_count: 1,
            fetcher_count: 1,
            serializer_count: 1,
            refresh_interval_seconds: 3600,
            max_pages: 9,
            page_size: 2,
            queue_capacity: 1024,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.producer_count == 0 {
            return Err(anyhow::anyhow!("调度器数量必须大于0"));
        }

        if self.fetcher_count == 0 {
            return Err(anyhow::anyhow!("抓取器数量必须大于0"));
        }

        if self.serializer_count == 0 {
            return Err(anyhow::anyhow!("合并器数量必须大于0"));
        }

        if self.refresh_interval_seconds == 0 {
            return Err(anyhow::anyhow!("刷新间隔必须大于0"));
        }

        if self.max_pages == 0 {
            return Err(anyhow::anyhow!("最大页数必须大于0"));
        }

        if self.page_size == 0 {
            return Err(anyhow::anyhow!("分页大小必须大于0"));
        }

        if self.queue_capacity == 0 {
            return Err(anyhow::anyhow!("队列容量必须大于0"));
        }

        // 单个链接的全部分页必须能一次放入工作队列
        if self.queue_capacity < self.max_pages as usize {
            return Err(anyhow::anyhow!(
                "队列容量 {} 不能小于最大页数 {}",
                self.queue_capacity,
                self.max_pages
            ));
        }

        Ok(())
    }

    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_interval_seconds as i64)
    }

    pub fn refresh_sleep(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_seconds)
    }
}
