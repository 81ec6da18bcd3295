use std::io::Write;

use crate::config::models::AppConfig;

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    // 验证默认值
    assert_eq!(config.pipeline.refresh_interval_seconds, 3600);
    assert_eq!(config.pipeline.max_pages, 9);
    assert_eq!(config.pipeline.page_size, 2);
    assert_eq!(config.pipeline.producer_count, 1);
    assert_eq!(config.fetcher.auth_header, "token");
    assert!(config.fetcher.auth_token.is_none());

    let source_types: Vec<&str> = config
        .sources
        .iter()
        .map(|s| s.source_type.as_str())
        .collect();
    assert_eq!(source_types, vec!["crowdstrike", "qualys"]);
    assert!(config.sources.iter().all(|s| s.endpoint.contains("[update_me]")));
}

#[test]
fn test_config_from_toml() {
    let toml_content = r#"
[database]
url = "postgresql://inventory:secret@db:5432/inventory"
max_connections = 15
min_connections = 2
connection_timeout_seconds = 30
idle_timeout_seconds = 600

[pipeline]
producer_count = 2
fetcher_count = 8
serializer_count = 4
refresh_interval_seconds = 1800
max_pages = 20
page_size = 100
queue_capacity = 500
shutdown_timeout_seconds = 10

[fetcher]
auth_token = "pre-issued-token"
auth_header = "X-Api-Token"
request_timeout_seconds = 15
max_retries = 3
retry_base_delay_ms = 250

[observability]
log_level = "debug"
log_format = "json"
metrics_enabled = true
metrics_bind_address = "127.0.0.1:9100"

[[sources]]
source_type = "crowdstrike"
endpoint = "https://edr.example.com/api/crowdstrike/hosts/get"
"#;

    let config = AppConfig::from_toml(toml_content).unwrap();

    assert_eq!(
        config.database.url,
        "postgresql://inventory:secret@db:5432/inventory"
    );
    assert_eq!(config.pipeline.fetcher_count, 8);
    assert_eq!(config.pipeline.max_pages, 20);
    assert_eq!(config.fetcher.auth_token.as_deref(), Some("pre-issued-token"));
    assert_eq!(config.fetcher.auth_header, "X-Api-Token");
    assert_eq!(config.observability.log_format, "json");
    assert_eq!(config.sources.len(), 1);
    assert_eq!(
        config.pipeline.refresh_interval(),
        chrono::Duration::seconds(1800)
    );
}

#[test]
fn test_config_to_toml() {
    let config = AppConfig::default();
    let toml_str = config.to_toml().unwrap();

    // Should be valid TOML that can be parsed back
    let parsed_config = AppConfig::from_toml(&toml_str).unwrap();
    assert_eq!(config.database.url, parsed_config.database.url);
    assert_eq!(config.sources, parsed_config.sources);
}

#[test]
fn test_load_missing_file_fails() {
    let result = AppConfig::load(Some("/nonexistent/inventory.toml"));
    assert!(result.is_err());
}

#[test]
fn test_load_file_with_env_override() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[pipeline]
producer_count = 1
fetcher_count = 3
serializer_count = 2
refresh_interval_seconds = 600
max_pages = 5
page_size = 50
queue_capacity = 64
shutdown_timeout_seconds = 5
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();

    // 文件中未出现的段落使用默认值
    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.pipeline.fetcher_count, 3);
    assert_eq!(config.pipeline.max_pages, 5);
    assert_eq!(config.fetcher.max_retries, 2);
    assert_eq!(config.sources.len(), 2);

    // 环境变量优先级最高
    std::env::set_var("INVENTORY_PIPELINE__SERIALIZER_COUNT", "6");
    std::env::set_var("INVENTORY_FETCHER__AUTH_HEADER", "X-Vendor-Token");
    let config = AppConfig::load(Some(&path)).unwrap();
    std::env::remove_var("INVENTORY_PIPELINE__SERIALIZER_COUNT");
    std::env::remove_var("INVENTORY_FETCHER__AUTH_HEADER");

    assert_eq!(config.pipeline.serializer_count, 6);
    assert_eq!(config.pipeline.fetcher_count, 3);
    assert_eq!(config.fetcher.auth_header, "X-Vendor-Token");
}
