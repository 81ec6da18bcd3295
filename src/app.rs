use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use inventory_core::{
    AppConfig, HostRepository, InventoryResult, LinkRecord, LinkRepository, RawPayload,
    SourceClient, WorkItem,
};
use inventory_dispatcher::LinkScheduler;
use inventory_domain::NormalizerRegistry;
use inventory_infrastructure::{
    DatabaseManager, HttpSourceClient, MetricsCollector, StructuredLogger, WorkQueue,
};
use inventory_worker::{HostLocks, MergeEngine, PageFetcher};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::shutdown::ShutdownManager;

type WorkerExit = (String, InventoryResult<()>);

/// 主应用程序
///
/// 负责存储初始化、两条工作队列以及三个工作池的启动与监管。
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    link_repo: Arc<dyn LinkRepository>,
    host_repo: Arc<dyn HostRepository>,
    source_client: Arc<dyn SourceClient>,
    registry: NormalizerRegistry,
    work_queue: WorkQueue<WorkItem>,
    payload_queue: WorkQueue<RawPayload>,
    metrics: MetricsCollector,
}

impl Application {
    /// 创建新的应用实例：连接数据库、执行迁移、写入数据源链接
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!(
            "初始化应用程序: 调度器 {} 抓取器 {} 合并器 {}",
            config.pipeline.producer_count,
            config.pipeline.fetcher_count,
            config.pipeline.serializer_count
        );

        let database = DatabaseManager::from_config(&config.database)
            .await
            .context("连接数据库失败")?;
        database.migrate().await.context("执行数据库迁移失败")?;
        info!("数据库已就绪: {:?}", database.database_type());

        let source_client: Arc<dyn SourceClient> = Arc::new(
            HttpSourceClient::new(&config.fetcher, config.pipeline.page_size)
                .context("创建数据源客户端失败")?,
        );

        let capacity = config.pipeline.queue_capacity;
        let app = Self {
            link_repo: database.link_repository(),
            host_repo: database.host_repository(),
            database,
            source_client,
            registry: NormalizerRegistry::with_defaults(),
            work_queue: WorkQueue::new("fetch", capacity),
            payload_queue: WorkQueue::new("payload", capacity),
            metrics: MetricsCollector::new(),
            config,
        };

        app.seed_links().await?;
        Ok(app)
    }

    /// 写入缺失的数据源链接，并把配置中的真实端点同步到已有链接
    async fn seed_links(&self) -> Result<()> {
        let links: Vec<LinkRecord> = self.config.sources.iter().map(|s| s.to_link()).collect();
        let inserted = self
            .link_repo
            .seed_links(&links)
            .await
            .context("初始化链接注册表失败")?;
        info!("链接注册表初始化完成，新增 {} 条链接", inserted);

        for link in links.iter().filter(|link| !link.has_placeholder_endpoint()) {
            self.link_repo
                .set_endpoint(&link.source_type, &link.endpoint)
                .await
                .with_context(|| format!("更新链接端点失败: {}", link.source_type))?;
        }

        for link in &links {
            if !self.registry.supports(&link.source_type) {
                warn!(
                    "数据源 {} 没有对应的归一化器，其数据将被丢弃",
                    link.source_type
                );
            }
        }

        Ok(())
    }

    pub fn link_repository(&self) -> Arc<dyn LinkRepository> {
        self.link_repo.clone()
    }

    pub fn host_repository(&self) -> Arc<dyn HostRepository> {
        self.host_repo.clone()
    }

    /// 运行管道直到收到关闭信号
    ///
    /// 任一工作者异常退出都会触发整个管道的优雅关闭。
    pub async fn run(&self, shutdown: ShutdownManager) -> Result<()> {
        let mut tasks = self.spawn_workers(&shutdown);
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(exit) => {
                        Self::report_exit(exit);
                        if !shutdown.is_shutdown() {
                            error!("工作者提前退出，关闭整个管道");
                            shutdown.shutdown();
                        }
                    }
                    None => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }

        let timeout = Duration::from_secs(self.config.pipeline.shutdown_timeout_seconds);
        let drained = tokio::time::timeout(timeout, async {
            while let Some(exit) = tasks.join_next().await {
                Self::report_exit(exit);
            }
        })
        .await;
        if drained.is_err() {
            warn!("等待工作者退出超时，强制终止剩余 {} 个工作者", tasks.len());
            tasks.abort_all();
        }

        self.report_queue_depths();
        self.database.close().await;
        info!("管道已停止");
        Ok(())
    }

    fn spawn_workers(&self, shutdown: &ShutdownManager) -> JoinSet<WorkerExit> {
        let pipeline = &self.config.pipeline;
        let mut tasks = JoinSet::new();

        for id in 0..pipeline.producer_count {
            let scheduler = LinkScheduler::new(
                self.link_repo.clone(),
                self.work_queue.clone(),
                pipeline,
                self.metrics.clone(),
            );
            let shutdown_rx = shutdown.subscribe();
            tasks.spawn(async move {
                (format!("producer-{id}"), scheduler.run(shutdown_rx).await)
            });
        }

        for id in 0..pipeline.fetcher_count {
            let fetcher = PageFetcher::new(
                self.source_client.clone(),
                self.work_queue.clone(),
                self.payload_queue.clone(),
                &self.config.fetcher,
                self.metrics.clone(),
            );
            let shutdown_rx = shutdown.subscribe();
            tasks.spawn(async move {
                (format!("fetcher-{id}"), fetcher.run(id, shutdown_rx).await)
            });
        }

        let locks = Arc::new(HostLocks::new());
        for id in 0..pipeline.serializer_count {
            let engine = MergeEngine::new(
                self.registry.clone(),
                self.host_repo.clone(),
                self.payload_queue.clone(),
                locks.clone(),
                self.metrics.clone(),
            );
            let shutdown_rx = shutdown.subscribe();
            tasks.spawn(async move {
                (format!("serializer-{id}"), engine.run(id, shutdown_rx).await)
            });
        }

        info!("已启动 {} 个工作者", tasks.len());
        tasks
    }

    fn report_exit(exit: Result<WorkerExit, tokio::task::JoinError>) {
        match exit {
            Ok((name, Ok(()))) => info!("工作者 {} 已退出", name),
            Ok((name, Err(e))) => error!("工作者 {} 出错退出: {}", name, e),
            Err(e) if e.is_panic() => error!("工作者崩溃: {}", e),
            Err(e) => warn!("工作者被取消: {}", e),
        }
    }

    fn report_queue_depths(&self) {
        let depths = [
            (self.work_queue.name(), self.work_queue.len()),
            (self.payload_queue.name(), self.payload_queue.len()),
        ];
        for (queue, depth) in depths {
            self.metrics.update_queue_depth(queue, depth);
        }
        StructuredLogger::log_queue_depths(&depths);
    }
}
