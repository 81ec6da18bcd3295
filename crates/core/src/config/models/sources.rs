use serde::{Deserialize, Serialize};

use crate::models::{LinkRecord, SourceType};

/// 初始化链接注册表时写入的数据源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source_type: String,
    pub endpoint: String,
}

impl SourceConfig {
    pub fn placeholder(source_type: SourceType) -> Self {
        Self {
            source_type: source_type.as_str().to_string(),
            endpoint: source_type.placeholder_endpoint(),
        }
    }

    pub fn to_link(&self) -> LinkRecord {
        LinkRecord::new(&self.source_type, &self.endpoint)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source_type.trim().is_empty() {
            return Err(anyhow::anyhow!("数据源类型不能为空"));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "数据源 {} 的端点必须是HTTP(S)地址: {}",
                self.source_type,
                self.endpoint
            ));
        }

        Ok(())
    }
}

pub fn default_sources() -> Vec<SourceConfig> {
    SourceType::ALL
        .iter()
        .map(|source| SourceConfig::placeholder(*source))
        .collect()
}
