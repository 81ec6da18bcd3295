use inventory_core::{HostRecord, PolicyRecord, SourceType};
use serde_json::{Map, Value};

use super::Normalizer;
use crate::extract;

/// 基于 Agent 的资产清单
#[derive(Debug, Clone, Copy, Default)]
pub struct CrowdStrikeNormalizer;

impl Normalizer for CrowdStrikeNormalizer {
    fn source_type(&self) -> &'static str {
        SourceType::CrowdStrike.as_str()
    }

    fn map_fields(&self, raw: &Map<String, Value>) -> HostRecord {
        HostRecord {
            identifier: extract::string(raw, "_id"),
            bios_info: extract::joined(&[
                extract::string(raw, "bios_manufacturer"),
                extract::string(raw, "bios_version"),
            ]),
            host_name: extract::string(raw, "hostname"),
            first_seen: extract::string(raw, "first_seen"),
            last_seen: extract::string(raw, "last_seen"),
            internal_ip: extract::string(raw, "local_ip"),
            external_ip: extract::string(raw, "external_ip"),
            os_version: extract::string(raw, "os_version"),
            mac_address: extract::string(raw, "mac_address"),
            platform: extract::string(raw, "platform_name"),
            status: extract::string(raw, "status"),
            modified_timestamp: extract::wrapped_date(raw, "modified_timestamp"),
            tags: extract::string_list(raw, "tags"),
            system_manufacturer: extract::string(raw, "system_manufacturer"),
            system_product_name: extract::string(raw, "system_product_name"),
            instance_id: extract::string(raw, "instance_id"),
            version: extract::string(raw, "agent_version"),
            policies: device_policies(raw),
            group_info: extract::list(raw, "groups"),
            ..HostRecord::default()
        }
    }
}

/// `device_policies` 是按策略类型分组的对象，按键名顺序展开
fn device_policies(raw: &Map<String, Value>) -> Vec<PolicyRecord> {
    match raw.get("device_policies") {
        Some(Value::Object(by_type)) => by_type
            .iter()
            .filter_map(|(policy_type, policy)| {
                policy
                    .as_object()
                    .map(|policy| to_policy(policy, Some(policy_type)))
            })
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|policy| to_policy(policy, None))
            .collect(),
        _ => Vec::new(),
    }
}

fn to_policy(policy: &Map<String, Value>, key: Option<&String>) -> PolicyRecord {
    PolicyRecord {
        policy_type: extract::string(policy, "policy_type").or_else(|| key.cloned()),
        policy_id: extract::string(policy, "policy_id"),
        applied: extract::boolean(policy, "applied"),
        settings_hash: extract::string(policy, "settings_hash"),
        assigned_date: extract::wrapped_date(policy, "assigned_date"),
        applied_date: extract::wrapped_date(policy, "applied_date"),
        rule_groups: extract::list(policy, "rule_groups"),
    }
}
