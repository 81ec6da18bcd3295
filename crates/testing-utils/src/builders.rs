//! Test data builders
//!
//! Host records with sensible defaults, and raw vendor objects in the
//! shapes the two built-in sources return.

use inventory_core::{HostRecord, LinkRecord, SourceType};
use serde_json::{json, Value};

/// Builder for creating test HostRecord values
pub struct HostRecordBuilder {
    record: HostRecord,
}

impl HostRecordBuilder {
    pub fn new(host_name: &str) -> Self {
        Self {
            record: HostRecord {
                host_name: Some(host_name.to_string()),
                data_source: Some(SourceType::CrowdStrike.as_str().to_string()),
                recent_raw_hash: Some(format!("hash-{host_name}")),
                raw_payloads: vec![json!({"hostname": host_name})],
                ..HostRecord::default()
            },
        }
    }

    pub fn with_internal_ip(mut self, ip: &str) -> Self {
        self.record.internal_ip = Some(ip.to_string());
        self
    }

    pub fn with_external_ip(mut self, ip: &str) -> Self {
        self.record.external_ip = Some(ip.to_string());
        self
    }

    pub fn with_os_version(mut self, os_version: &str) -> Self {
        self.record.os_version = Some(os_version.to_string());
        self
    }

    pub fn with_hash(mut self, hash: &str) -> Self {
        self.record.recent_raw_hash = Some(hash.to_string());
        self
    }

    pub fn without_hash(mut self) -> Self {
        self.record.recent_raw_hash = None;
        self
    }

    pub fn with_raw_payloads(mut self, raw_payloads: Vec<Value>) -> Self {
        self.record.raw_payloads = raw_payloads;
        self
    }

    pub fn build(self) -> HostRecord {
        self.record
    }
}

/// Seed links for every known source, pointing at the given base URL
pub fn links_for(base_url: &str) -> Vec<LinkRecord> {
    SourceType::ALL
        .iter()
        .map(|source| {
            LinkRecord::new(
                source.as_str(),
                format!("{base_url}/api/{}/hosts/get", source.as_str()),
            )
        })
        .collect()
}

/// Raw agent-based (crowdstrike) host object
pub fn crowdstrike_host(id: &str, hostname: &str, external_ip: &str) -> Value {
    json!({
        "_id": id,
        "hostname": hostname,
        "local_ip": "10.0.0.10",
        "external_ip": external_ip,
        "bios_manufacturer": "Manufacturer",
        "bios_version": "1.0",
        "os_version": "Ubuntu 22.04",
        "platform_name": "Linux",
        "modified_timestamp": {"$date": "2024-01-01T00:00:00Z"},
        "device_policies": {
            "prevention": {"policy_id": "p-1", "applied": true}
        }
    })
}

/// Raw scan-based (qualys) host object
pub fn qualys_host(id: &str, dns_host_name: &str) -> Value {
    json!({
        "id": id,
        "dnsHostName": dns_host_name,
        "biosDescription": "Manufacturer 1.0",
        "os": "Windows Server 2019",
        "lastVulnScan": {"$date": "2024-01-02T00:00:00Z"}
    })
}
