//! 厂商数据归一化
//!
//! 每种数据源对应一个 [`Normalizer`]，把厂商对象逐字段映射为 [`HostRecord`]。
//! 映射是纯函数：相同的原始对象与摄取时间总是得到相同的记录。

pub mod crowdstrike;
pub mod qualys;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use inventory_core::{HostRecord, InventoryError, InventoryResult, RawPayload};
use serde_json::{Map, Value};
use tracing::debug;

use crate::fingerprint::fingerprint;

pub use crowdstrike::CrowdStrikeNormalizer;
pub use qualys::QualysNormalizer;

/// 响应体中可能承载记录数组的字段
const ENVELOPE_FIELDS: [&str; 4] = ["body", "resources", "data", "hosts"];

/// 单个数据源的归一化器
pub trait Normalizer: Send + Sync {
    /// 数据源类型，同时写入 `data_source`
    fn source_type(&self) -> &'static str;

    /// 映射单个厂商对象的业务字段
    fn map_fields(&self, raw: &Map<String, Value>) -> HostRecord;

    /// 归一化单个厂商对象，并记录来源、原始数据与指纹
    fn normalize_record(&self, raw: &Map<String, Value>, ingested_at: DateTime<Utc>) -> HostRecord {
        let raw_value = Value::Object(raw.clone());
        let mut record = self.map_fields(raw);
        record.data_source = Some(self.source_type().to_string());
        record.recent_raw_hash = Some(fingerprint(&raw_value));
        record.raw_payloads = vec![raw_value];
        record.ingest_timestamp = Some(ingested_at);
        record
    }

    /// 归一化整个响应体，非对象元素被跳过
    fn normalize(&self, body: &Value, ingested_at: DateTime<Utc>) -> Vec<HostRecord> {
        records_in_body(body)
            .iter()
            .filter_map(|item| match item {
                Value::Object(raw) => Some(self.normalize_record(raw, ingested_at)),
                other => {
                    debug!(
                        source_type = self.source_type(),
                        "跳过非对象元素: {}",
                        other
                    );
                    None
                }
            })
            .collect()
    }
}

/// 从响应体中取出记录数组
///
/// 接受顶层数组，或在 `body`/`resources`/`data`/`hosts` 字段中携带数组的对象。
pub fn records_in_body(body: &Value) -> &[Value] {
    match body {
        Value::Array(items) => items,
        Value::Object(obj) => ENVELOPE_FIELDS
            .iter()
            .find_map(|field| obj.get(*field).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// 数据源类型到归一化器的注册表
#[derive(Clone, Default)]
pub struct NormalizerRegistry {
    normalizers: HashMap<String, Arc<dyn Normalizer>>,
}

impl NormalizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册所有内置数据源
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CrowdStrikeNormalizer));
        registry.register(Arc::new(QualysNormalizer));
        registry
    }

    pub fn register(&mut self, normalizer: Arc<dyn Normalizer>) {
        self.normalizers
            .insert(normalizer.source_type().to_string(), normalizer);
    }

    pub fn get(&self, source_type: &str) -> Option<Arc<dyn Normalizer>> {
        self.normalizers.get(source_type).cloned()
    }

    pub fn supports(&self, source_type: &str) -> bool {
        self.normalizers.contains_key(source_type)
    }

    pub fn source_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.normalizers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// 归一化原始数据，未注册的数据源类型返回错误
    pub fn normalize(
        &self,
        payload: &RawPayload,
        ingested_at: DateTime<Utc>,
    ) -> InventoryResult<Vec<HostRecord>> {
        let normalizer = self
            .get(&payload.source_type)
            .ok_or_else(|| InventoryError::UnknownSourceType(payload.source_type.clone()))?;
        Ok(normalizer.normalize(&payload.body, ingested_at))
    }
}

impl std::fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerRegistry")
            .field("source_types", &self.source_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_in_body_shapes() {
        let array = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(records_in_body(&array).len(), 2);

        let wrapped = json!({"resources": [{"id": 1}], "meta": {"total": 1}});
        assert_eq!(records_in_body(&wrapped).len(), 1);

        let body = json!({"body": [{"id": 1}, {"id": 2}, {"id": 3}]});
        assert_eq!(records_in_body(&body).len(), 3);

        assert!(records_in_body(&json!({"error": "nope"})).is_empty());
        assert!(records_in_body(&json!("text")).is_empty());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = NormalizerRegistry::with_defaults();
        assert_eq!(registry.source_types(), vec!["crowdstrike", "qualys"]);
        assert!(registry.supports("qualys"));
        assert!(!registry.supports("unknown"));
    }

    #[test]
    fn test_registry_rejects_unknown_source() {
        let registry = NormalizerRegistry::with_defaults();
        let payload = RawPayload::new("unknown", json!([{"id": "1"}]));
        let err = registry.normalize(&payload, Utc::now()).unwrap_err();
        assert!(matches!(err, InventoryError::UnknownSourceType(ref s) if s == "unknown"));
    }

    #[test]
    fn test_non_object_elements_skipped() {
        let registry = NormalizerRegistry::with_defaults();
        let payload = RawPayload::new(
            "qualys",
            json!([{"id": "1", "dnsHostName": "a"}, "garbage", 7, null]),
        );
        let records = registry.normalize(&payload, Utc::now()).unwrap();
        assert_eq!(records.len(), 1);
    }
}
