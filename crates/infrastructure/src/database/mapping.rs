//! 数据库行映射的共享工具
//!
//! 身份列在 SQLite 与 PostgreSQL 中的约定相同：
//! `host_name`/`internal_ip` 缺失时存空字符串，`external_ip` 缺失时存 NULL。

use chrono::{DateTime, Utc};
use inventory_core::{HostRecord, InventoryError, InventoryResult};

/// 唯一索引列的取值，缺失视为空字符串
pub fn key_column(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

/// 可空列的取值，空字符串视为缺失
pub fn nullable_column(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// 主机记录的身份列
pub struct HostColumns<'a> {
    pub host_name: &'a str,
    pub internal_ip: &'a str,
    pub external_ip: Option<&'a str>,
    pub recent_raw_hash: Option<&'a str>,
}

impl<'a> HostColumns<'a> {
    pub fn of(record: &'a HostRecord) -> Self {
        Self {
            host_name: key_column(record.host_name.as_deref()),
            internal_ip: key_column(record.internal_ip.as_deref()),
            external_ip: nullable_column(record.external_ip.as_deref()),
            recent_raw_hash: record.recent_raw_hash.as_deref(),
        }
    }
}

/// SQLite 以毫秒时间戳存储时间
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(millis: i64) -> InventoryResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| InventoryError::Serialization(format!("无效的时间戳: {millis}")))
}

pub fn encode_document(record: &HostRecord) -> InventoryResult<String> {
    serde_json::to_string(record)
        .map_err(|e| InventoryError::Serialization(format!("序列化主机记录失败: {e}")))
}

pub fn decode_document(document: &str) -> InventoryResult<HostRecord> {
    serde_json::from_str(document)
        .map_err(|e| InventoryError::Serialization(format!("解析主机记录失败: {e}")))
}
