//! 主机记录合并策略
//!
//! 新记录中的非空字段覆盖已有值，空字段保留已有值；
//! `raw_payloads` 只追加，不覆盖。

use inventory_core::{HostRecord, MergeKind, PolicyRecord};
use serde_json::Value;

/// 合并意义上的"空值"
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for bool {
    fn is_blank(&self) -> bool {
        false
    }
}

impl Blank for Value {
    fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl<T: Blank> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Blank::is_blank)
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for PolicyRecord {
    fn is_blank(&self) -> bool {
        *self == PolicyRecord::default()
    }
}

impl<Tz: chrono::TimeZone> Blank for chrono::DateTime<Tz> {
    fn is_blank(&self) -> bool {
        false
    }
}

/// 非空的新值覆盖旧值
fn overlay<T: Blank>(target: &mut T, incoming: T) {
    if !incoming.is_blank() {
        *target = incoming;
    }
}

/// 合并两条记录，返回合并结果
pub fn merge_host_records(existing: HostRecord, incoming: HostRecord) -> HostRecord {
    let mut merged = existing;

    macro_rules! overlay_fields {
        ($($field:ident),* $(,)?) => {
            $( overlay(&mut merged.$field, incoming.$field); )*
        };
    }

    merged.raw_payloads.extend(incoming.raw_payloads);

    overlay_fields!(
        agent_info,
        bios_info,
        data_source,
        external_ip,
        first_seen,
        group_info,
        hardware_info,
        host_name,
        identifier,
        instance_id,
        internal_ip,
        last_seen,
        mac_address,
        modified_timestamp,
        open_ports,
        os_version,
        platform,
        policies,
        software_info,
        source_specific,
        status,
        system_manufacturer,
        system_product_name,
        tags,
        version,
        vulnerabilities,
        ingest_timestamp,
        recent_raw_hash,
    );

    merged
}

/// 合并引擎对一条新记录的处理结论
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// 没有候选记录，直接插入
    Insert(HostRecord),
    /// 原始数据未变化，不写入
    Unchanged,
    /// 与已有记录合并后更新
    Update(HostRecord),
}

impl MergeOutcome {
    pub fn kind(&self) -> MergeKind {
        match self {
            MergeOutcome::Insert(_) => MergeKind::Insert,
            MergeOutcome::Unchanged => MergeKind::Unchanged,
            MergeOutcome::Update(_) => MergeKind::Update,
        }
    }
}

/// 根据候选记录决定插入、跳过或合并
///
/// 只有双方指纹都存在且相等时才视为未变化。
pub fn reconcile(existing: Option<HostRecord>, incoming: HostRecord) -> MergeOutcome {
    match existing {
        None => MergeOutcome::Insert(incoming),
        Some(existing)
            if existing.recent_raw_hash.is_some()
                && existing.recent_raw_hash == incoming.recent_raw_hash =>
        {
            MergeOutcome::Unchanged
        }
        Some(existing) => MergeOutcome::Update(merge_host_records(existing, incoming)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn existing() -> HostRecord {
        HostRecord {
            host_name: Some("web-01".into()),
            external_ip: Some("203.0.113.7".into()),
            os_version: Some("Ubuntu 20.04".into()),
            platform: Some("Linux".into()),
            tags: vec!["prod".into()],
            raw_payloads: vec![json!({"id": "old"})],
            recent_raw_hash: Some("old-hash".into()),
            ..HostRecord::default()
        }
    }

    #[test]
    fn test_incoming_values_take_precedence() {
        let incoming = HostRecord {
            host_name: Some("web-01".into()),
            os_version: Some("Ubuntu 22.04".into()),
            platform: Some(String::new()),
            tags: Vec::new(),
            agent_info: Some(json!({})),
            raw_payloads: vec![json!({"id": "new"})],
            recent_raw_hash: Some("new-hash".into()),
            ..HostRecord::default()
        };

        let merged = merge_host_records(existing(), incoming);
        assert_eq!(merged.os_version.as_deref(), Some("Ubuntu 22.04"));
        assert_eq!(merged.platform.as_deref(), Some("Linux"));
        assert_eq!(merged.tags, vec!["prod"]);
        assert_eq!(merged.agent_info, None);
        assert_eq!(merged.external_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(merged.recent_raw_hash.as_deref(), Some("new-hash"));
    }

    #[test]
    fn test_raw_payloads_are_appended() {
        let incoming = HostRecord {
            raw_payloads: vec![json!({"id": "new"})],
            ..HostRecord::default()
        };
        let merged = merge_host_records(existing(), incoming);
        assert_eq!(
            merged.raw_payloads,
            vec![json!({"id": "old"}), json!({"id": "new"})]
        );
    }

    #[test]
    fn test_reconcile_without_candidate_inserts() {
        let incoming = existing();
        assert_eq!(
            reconcile(None, incoming.clone()),
            MergeOutcome::Insert(incoming)
        );
    }

    #[test]
    fn test_reconcile_same_fingerprint_is_unchanged() {
        let mut incoming = existing();
        incoming.os_version = Some("something else".into());
        assert_eq!(reconcile(Some(existing()), incoming), MergeOutcome::Unchanged);
    }

    #[test]
    fn test_reconcile_missing_fingerprint_merges() {
        let mut stored = existing();
        stored.recent_raw_hash = None;
        let mut incoming = existing();
        incoming.recent_raw_hash = None;

        let outcome = reconcile(Some(stored), incoming);
        match outcome {
            MergeOutcome::Update(merged) => assert_eq!(merged.raw_payloads.len(), 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_outcome_kind() {
        let stored = existing();
        let mut changed = existing();
        changed.recent_raw_hash = Some("new-hash".into());

        assert_eq!(reconcile(None, existing()).kind(), MergeKind::Insert);
        assert_eq!(
            reconcile(Some(stored.clone()), existing()).kind(),
            MergeKind::Unchanged
        );
        assert_eq!(reconcile(Some(stored), changed).kind(), MergeKind::Update);
    }

    #[test]
    fn test_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(json!([]).is_blank());
        assert!(json!({}).is_blank());
        assert!(json!("").is_blank());
        assert!(!json!(0).is_blank());
        assert!(!json!(false).is_blank());
        assert!(Option::<String>::None.is_blank());
        assert!(!Some("x".to_string()).is_blank());
    }
}
