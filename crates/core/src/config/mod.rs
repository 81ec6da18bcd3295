//! 配置管理
//!
//! 所有运行参数集中在 [`AppConfig`] 中：默认值、TOML 配置文件与
//! `INVENTORY_` 前缀的环境变量依次覆盖。

pub mod models;

pub use models::*;

#[cfg(test)]
mod tests;
