//! 主机资产的纯领域逻辑：厂商数据归一化、指纹计算与合并策略
//!
//! 本 crate 不做任何 I/O，所有函数对相同输入总是给出相同输出。

pub mod extract;
pub mod fingerprint;
pub mod merge;
pub mod normalizers;

pub use fingerprint::fingerprint;
pub use merge::{merge_host_records, reconcile, Blank, MergeOutcome};
pub use normalizers::{
    records_in_body, CrowdStrikeNormalizer, Normalizer, NormalizerRegistry, QualysNormalizer,
};
