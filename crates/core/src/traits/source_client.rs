use async_trait::async_trait;

use crate::{models::WorkItem, Result};

/// 外部数据源客户端
///
/// 每次调用只发出一个分页请求，返回厂商原始 JSON。
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_page(&self, item: &WorkItem) -> Result<serde_json::Value>;
}
