use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::info;

type Sender = Option<broadcast::Sender<()>>;

/// 管道关闭信号
///
/// 生产者、拉取器和序列化器订阅同一个广播。发送器被取走即视为已关闭，
/// 之后的订阅者拿到立即就绪的接收器。
#[derive(Clone)]
pub struct ShutdownManager {
    sender: Arc<Mutex<Sender>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }

    fn sender(&self) -> MutexGuard<'_, Sender> {
        self.sender.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        match self.sender().as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(1);
                let _ = sender.send(());
                receiver
            }
        }
    }

    /// 广播关闭信号，只有第一次调用生效
    pub fn shutdown(&self) {
        if let Some(sender) = self.sender().take() {
            let receivers = sender.send(()).unwrap_or(0);
            info!(event = "shutdown_signalled", receivers, "管道关闭信号已广播");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender().is_none()
    }

    pub async fn wait_for_shutdown(&self) {
        let _ = self.subscribe().recv().await;
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_every_worker_pool_receives_the_signal() {
        let manager = ShutdownManager::new();
        let mut producer = manager.subscribe();
        let mut fetcher = manager.subscribe();
        let mut serializer = manager.subscribe();
        assert!(!manager.is_shutdown());

        manager.shutdown();

        for rx in [&mut producer, &mut fetcher, &mut serializer] {
            assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_ok());
        }
        assert!(manager.is_shutdown());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_shutdown_immediately() {
        let manager = ShutdownManager::new();
        manager.shutdown();
        manager.shutdown();

        let mut rx = manager.subscribe();
        assert_eq!(rx.try_recv(), Ok(()));
    }

    #[tokio::test]
    async fn test_shutdown_from_a_clone_wakes_waiters() {
        let manager = ShutdownManager::new();
        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.wait_for_shutdown().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.clone().shutdown();

        assert!(timeout(Duration::from_millis(100), waiter).await.is_ok());
        assert!(manager.is_shutdown());
    }
}
