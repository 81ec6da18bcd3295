use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::InventoryError;

/// 已知的数据源类型
///
/// - `CrowdStrike`: 基于 Agent 的资产清单（Source A）
/// - `Qualys`: 基于扫描的资产清单（Source B）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    CrowdStrike,
    Qualys,
}

impl SourceType {
    pub const ALL: [SourceType; 2] = [SourceType::CrowdStrike, SourceType::Qualys];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::CrowdStrike => "crowdstrike",
            SourceType::Qualys => "qualys",
        }
    }

    /// 初始化时写入的占位地址，需要运维人员配置真实地址
    pub fn placeholder_endpoint(&self) -> String {
        format!("https://{PLACEHOLDER_HOST}/api/{}/hosts/get", self.as_str())
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crowdstrike" => Ok(SourceType::CrowdStrike),
            "qualys" => Ok(SourceType::Qualys),
            other => Err(InventoryError::UnknownSourceType(other.to_string())),
        }
    }
}

/// 占位主机名
pub const PLACEHOLDER_HOST: &str = "[update_me]";

/// 数据源链接记录
///
/// `source_type` 唯一，`last_checked` 只由调度器修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source_type: String,
    pub endpoint: String,
    pub last_checked: DateTime<Utc>,
}

impl LinkRecord {
    /// 创建新链接，`last_checked` 设为纪元时间，首次运行即到期
    pub fn new(source_type: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            endpoint: endpoint.into(),
            last_checked: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// 是否已到刷新时间：`last_checked <= now - refresh_interval`
    pub fn is_due(&self, now: DateTime<Utc>, refresh_interval: Duration) -> bool {
        self.last_checked <= now - refresh_interval
    }

    /// 端点是否仍为占位地址
    pub fn has_placeholder_endpoint(&self) -> bool {
        self.endpoint.contains(PLACEHOLDER_HOST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_round_trip_names() {
        for source in SourceType::ALL {
            assert_eq!(source.as_str().parse::<SourceType>().unwrap(), source);
        }
        assert!("unknown".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_new_link_is_immediately_due() {
        let link = LinkRecord::new("qualys", SourceType::Qualys.placeholder_endpoint());
        assert!(link.is_due(Utc::now(), Duration::hours(1)));
        assert!(link.has_placeholder_endpoint());
    }

    #[test]
    fn test_recently_checked_link_is_not_due() {
        let now = Utc::now();
        let mut link = LinkRecord::new("crowdstrike", "https://edr.example.com/hosts");
        link.last_checked = now - Duration::minutes(59);
        assert!(!link.is_due(now, Duration::hours(1)));

        link.last_checked = now - Duration::hours(1);
        assert!(link.is_due(now, Duration::hours(1)));
    }
}
