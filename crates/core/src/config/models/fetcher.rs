use serde::{Deserialize, Serialize};

/// 抓取器配置
///
/// `auth_token` 是预先签发的令牌，本系统只负责携带，不负责获取或轮换。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub auth_token: Option<String>,
    pub auth_header: String,
    pub request_timeout_seconds: u64,
    /// 临时性失败的最大重试次数，0 表示不重试
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            auth_header: "token".to_string(),
            request_timeout_seconds: 30,
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

impl FetcherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth_header.trim().is_empty() {
            return Err(anyhow::anyhow!("认证头名称不能为空"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        if self.max_retries > 10 {
            return Err(anyhow::anyhow!(
                "最大重试次数不能超过10: {}",
                self.max_retries
            ));
        }

        Ok(())
    }
}
