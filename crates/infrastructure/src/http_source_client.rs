use std::time::Duration;

use async_trait::async_trait;
use inventory_core::{FetcherConfig, InventoryError, InventoryResult, SourceClient, WorkItem};
use serde_json::Value;
use tracing::debug;

/// 通过 HTTP POST 拉取厂商分页数据
///
/// 请求形如 `POST {endpoint}?limit={page_size}&skip={page_offset}`，
/// 认证令牌放在可配置的请求头中。
#[derive(Debug, Clone)]
pub struct HttpSourceClient {
    client: reqwest::Client,
    auth_header: String,
    auth_token: Option<String>,
    page_size: u32,
}

impl HttpSourceClient {
    pub fn new(config: &FetcherConfig, page_size: u32) -> InventoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| InventoryError::Configuration(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            auth_header: config.auth_header.clone(),
            auth_token: config.auth_token.clone(),
            page_size,
        })
    }

    fn classify(err: reqwest::Error, endpoint: &str) -> InventoryError {
        if err.is_decode() {
            InventoryError::Serialization(format!("解析响应失败 {endpoint}: {err}"))
        } else if err.is_builder() {
            InventoryError::Configuration(format!("无效的请求地址 {endpoint}: {err}"))
        } else {
            InventoryError::Network(format!("{endpoint}: {err}"))
        }
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_page(&self, item: &WorkItem) -> InventoryResult<Value> {
        let mut request = self
            .client
            .post(&item.endpoint)
            .query(&[("limit", self.page_size), ("skip", item.page_offset)]);

        if let Some(token) = &self.auth_token {
            request = request.header(self.auth_header.as_str(), token.as_str());
        }

        debug!(
            "请求数据源: source_type={}, endpoint={}, page_offset={}",
            item.source_type, item.endpoint, item.page_offset
        );

        let response = request
            .send()
            .await
            .map_err(|e| Self::classify(e, &item.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InventoryError::UpstreamStatus {
                status: status.as_u16(),
                endpoint: item.endpoint.clone(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Self::classify(e, &item.endpoint))
    }
}
