pub mod host;
pub mod link;
pub mod work;

pub use host::{HostRecord, MergeKind, PolicyRecord};
pub use link::{LinkRecord, SourceType, PLACEHOLDER_HOST};
pub use work::{RawPayload, WorkItem};
