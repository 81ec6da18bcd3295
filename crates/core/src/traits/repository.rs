use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    models::{HostRecord, LinkRecord},
    Result,
};

/// 链接注册表访问接口
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// 写入缺失的数据源链接，已存在的 `source_type` 保持不变，返回新增数量
    async fn seed_links(&self, links: &[LinkRecord]) -> Result<u64>;

    /// 更新已存在链接的端点地址
    async fn set_endpoint(&self, source_type: &str, endpoint: &str) -> Result<bool>;

    /// 根据数据源类型查询链接
    async fn get_by_source_type(&self, source_type: &str) -> Result<Option<LinkRecord>>;

    /// 获取全部链接
    async fn list(&self) -> Result<Vec<LinkRecord>>;

    /// 查询所有 `last_checked <= now - refresh_interval` 的链接
    async fn due_links(
        &self,
        now: DateTime<Utc>,
        refresh_interval: Duration,
    ) -> Result<Vec<LinkRecord>>;

    /// 更新链接的 `last_checked`
    async fn mark_checked(&self, source_type: &str, now: DateTime<Utc>) -> Result<()>;

    /// 在事务中认领所有到期链接
    ///
    /// 事务提交前，其他调度器实例无法把同一链接视为到期。
    /// 丢弃返回值而不调用 [`LinkClaim::commit`] 会回滚。
    async fn claim_due_links(
        &self,
        now: DateTime<Utc>,
        refresh_interval: Duration,
    ) -> Result<Box<dyn LinkClaim>>;
}

/// 一次到期链接认领，对应一个数据库事务
#[async_trait]
pub trait LinkClaim: Send {
    /// 本次认领到的链接
    fn links(&self) -> &[LinkRecord];

    /// 在同一事务中标记链接已检查
    async fn mark_checked(&mut self, source_type: &str, now: DateTime<Utc>) -> Result<()>;

    /// 提交事务
    async fn commit(&mut self) -> Result<()>;
}

/// 主机记录存储接口
#[async_trait]
pub trait HostRepository: Send + Sync {
    /// 按合并候选键 `(host_name, external_ip)` 查找，缺失值按空值精确匹配
    async fn find_by_host_and_external_ip(
        &self,
        host_name: Option<&str>,
        external_ip: Option<&str>,
    ) -> Result<Option<HostRecord>>;

    /// 插入新记录
    async fn insert(&self, record: &HostRecord) -> Result<()>;

    /// 以 `host_name` 为键更新第一条匹配记录，返回是否有记录被更新
    async fn update_by_host_name(&self, record: &HostRecord) -> Result<bool>;

    /// 记录总数
    async fn count(&self) -> Result<i64>;

    /// 获取全部记录
    async fn list(&self) -> Result<Vec<HostRecord>>;
}
