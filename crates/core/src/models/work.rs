use serde::{Deserialize, Serialize};

use super::link::LinkRecord;

/// 一个分页抓取工作项，由调度器产生、抓取池消费
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub source_type: String,
    pub endpoint: String,
    /// 页偏移，从 1 开始
    pub page_offset: u32,
}

impl WorkItem {
    pub fn for_link(link: &LinkRecord, page_offset: u32) -> Self {
        Self {
            source_type: link.source_type.clone(),
            endpoint: link.endpoint.clone(),
            page_offset,
        }
    }
}

/// 原始厂商数据，由抓取池产生、合并引擎消费
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    pub source_type: String,
    pub body: serde_json::Value,
}

impl RawPayload {
    pub fn new(source_type: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            source_type: source_type.into(),
            body,
        }
    }
}
