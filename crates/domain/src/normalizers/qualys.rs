use inventory_core::{HostRecord, SourceType};
use serde_json::{Map, Value};

use super::Normalizer;
use crate::extract;

/// 基于扫描的资产清单
///
/// `host_name` 与 `internal_ip` 都取自 `dnsHostName`，下游依赖这一行为。
#[derive(Debug, Clone, Copy, Default)]
pub struct QualysNormalizer;

impl Normalizer for QualysNormalizer {
    fn source_type(&self) -> &'static str {
        SourceType::Qualys.as_str()
    }

    fn map_fields(&self, raw: &Map<String, Value>) -> HostRecord {
        let dns_host_name = extract::string(raw, "dnsHostName");

        HostRecord {
            identifier: extract::string(raw, "id"),
            host_name: dns_host_name.clone(),
            internal_ip: dns_host_name,
            bios_info: extract::string(raw, "biosDescription"),
            external_ip: extract::string(raw, "address"),
            os_version: extract::string(raw, "os"),
            modified_timestamp: extract::wrapped_date(raw, "modified"),
            tags: extract::string_list(raw, "tags"),
            system_manufacturer: extract::string(raw, "manufacturer"),
            system_product_name: extract::string(raw, "model"),
            agent_info: extract::json(raw, "agentInfo"),
            vulnerabilities: extract::json(raw, "vuln"),
            last_seen: extract::wrapped_date(raw, "lastVulnScan"),
            open_ports: extract::list(raw, "openPort"),
            software_info: extract::json(raw, "software"),
            hardware_info: extract::json(raw, "processor"),
            ..HostRecord::default()
        }
    }
}
