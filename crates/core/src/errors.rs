use thiserror::Error;

/// 采集管道错误类型定义
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("上游返回非成功状态码 {status}: {endpoint}")]
    UpstreamStatus { status: u16, endpoint: String },

    #[error("未知的数据源类型: {0}")]
    UnknownSourceType(String),

    #[error("工作队列已关闭: {0}")]
    QueueClosed(String),

    #[error("收到关闭信号")]
    Shutdown,

    #[error("内部错误: {0}")]
    Internal(String),
}

impl InventoryError {
    /// 是否为可重试的临时性错误
    ///
    /// 网络错误、5xx 与 429 视为临时错误，其余均为永久错误。
    pub fn is_transient(&self) -> bool {
        match self {
            InventoryError::Network(_) => true,
            InventoryError::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        InventoryError::Serialization(err.to_string())
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(InventoryError::Network("connection reset".into()).is_transient());
        assert!(InventoryError::UpstreamStatus {
            status: 503,
            endpoint: "https://vendor/api".into()
        }
        .is_transient());
        assert!(InventoryError::UpstreamStatus {
            status: 429,
            endpoint: "https://vendor/api".into()
        }
        .is_transient());
        assert!(!InventoryError::UpstreamStatus {
            status: 404,
            endpoint: "https://vendor/api".into()
        }
        .is_transient());
        assert!(!InventoryError::UnknownSourceType("unknown".into()).is_transient());
        assert!(!InventoryError::Serialization("bad json".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = InventoryError::UnknownSourceType("unknown".into());
        assert_eq!(err.to_string(), "未知的数据源类型: unknown");
    }
}
