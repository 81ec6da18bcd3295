use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 主机上应用的策略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRecord {
    pub policy_type: Option<String>,
    pub policy_id: Option<String>,
    pub applied: Option<bool>,
    pub settings_hash: Option<String>,
    pub assigned_date: Option<String>,
    pub applied_date: Option<String>,
    pub rule_groups: Vec<Value>,
}

/// 归一化后的主机记录
///
/// 所有厂商数据都映射到这一结构。缺失的可选字段保持为空，不会导致转换失败。
///
/// # 身份字段
///
/// - 存储唯一键：`(host_name, internal_ip)`
/// - 合并候选匹配：`(host_name, external_ip)`
///
/// `raw_payloads` 记录每次摄取的原始厂商对象，`recent_raw_hash` 是最近一次
/// 原始对象的指纹。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostRecord {
    pub agent_info: Option<Value>,
    pub bios_info: Option<String>,
    pub data_source: Option<String>,
    pub external_ip: Option<String>,
    pub first_seen: Option<String>,
    pub raw_payloads: Vec<Value>,
    pub group_info: Vec<Value>,
    pub hardware_info: Option<Value>,
    pub host_name: Option<String>,
    pub identifier: Option<String>,
    pub instance_id: Option<String>,
    pub internal_ip: Option<String>,
    pub last_seen: Option<String>,
    pub mac_address: Option<String>,
    pub modified_timestamp: Option<String>,
    pub open_ports: Vec<Value>,
    pub os_version: Option<String>,
    pub platform: Option<String>,
    pub policies: Vec<PolicyRecord>,
    pub software_info: Option<Value>,
    pub source_specific: Option<Value>,
    pub status: Option<String>,
    pub system_manufacturer: Option<String>,
    pub system_product_name: Option<String>,
    pub tags: Vec<String>,
    pub version: Option<String>,
    pub vulnerabilities: Option<Value>,
    pub ingest_timestamp: Option<DateTime<Utc>>,
    pub recent_raw_hash: Option<String>,
}

impl HostRecord {
    /// 用于日志的简短描述
    pub fn describe(&self) -> String {
        format!(
            "{}@{} ({})",
            self.host_name.as_deref().unwrap_or("<unnamed>"),
            self.external_ip
                .as_deref()
                .or(self.internal_ip.as_deref())
                .unwrap_or("-"),
            self.data_source.as_deref().unwrap_or("unknown")
        )
    }
}

/// 一条主机记录的合并结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeKind {
    Insert,
    Unchanged,
    Update,
}

impl MergeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeKind::Insert => "insert",
            MergeKind::Unchanged => "unchanged",
            MergeKind::Update => "update",
        }
    }
}
