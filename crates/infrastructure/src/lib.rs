pub mod database;
pub mod http_source_client;
pub mod in_memory_queue;
pub mod observability;

pub use database::*;
pub use http_source_client::HttpSourceClient;
pub use in_memory_queue::WorkQueue;
pub use observability::*;
