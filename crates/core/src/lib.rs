pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::*;
pub use errors::*;
pub use models::{
    HostRecord, LinkRecord, MergeKind, PolicyRecord, RawPayload, SourceType, WorkItem,
};
pub use traits::{HostRepository, LinkClaim, LinkRepository, SourceClient};

/// 统一的Result类型
pub type InventoryResult<T> = std::result::Result<T, InventoryError>;
