pub mod app_config;
pub mod database;
pub mod fetcher;
pub mod observability;
pub mod pipeline;
pub mod sources;

// Re-export main types for easier imports
pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use fetcher::FetcherConfig;
pub use observability::ObservabilityConfig;
pub use pipeline::PipelineConfig;
pub use sources::{default_sources, SourceConfig};
