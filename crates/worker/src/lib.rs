//! Pipeline workers
//!
//! - [`PageFetcher`]: 从抓取队列取工作项，请求数据源，产出原始数据
//! - [`MergeEngine`]: 归一化原始数据并与已存储的主机记录合并

pub mod fetcher;
pub mod host_lock;
pub mod merge_engine;

pub use fetcher::{FetchOutcome, PageFetcher};
pub use host_lock::HostLocks;
pub use merge_engine::{MergeEngine, MergeSummary};
