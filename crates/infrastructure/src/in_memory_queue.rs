use std::sync::Arc;

use inventory_core::{InventoryError, InventoryResult};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// 有界内存工作队列
///
/// 基于 Tokio mpsc 通道，接收端包装在 `Arc<Mutex<_>>` 中以支持多个消费者。
/// 队列满时 `push` 等待，形成背压；队列空时 `pop` 等待。
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: Arc<str>,
    sender: mpsc::Sender<T>,
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<T: Send> WorkQueue<T> {
    pub fn new(name: &str, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        debug!("Created work queue '{}' (capacity: {})", name, capacity);
        Self {
            name: Arc::from(name),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 入队，队列满时等待空位
    pub async fn push(&self, item: T) -> InventoryResult<()> {
        self.sender
            .send(item)
            .await
            .map_err(|_| InventoryError::QueueClosed(self.name.to_string()))
    }

    /// 非阻塞批量入队，要么全部入队，要么一个也不入队
    ///
    /// 空位不足时返回 `Ok(false)`。
    pub fn try_push_all(&self, items: Vec<T>) -> InventoryResult<bool> {
        match self.sender.try_reserve_many(items.len()) {
            Ok(permits) => {
                for (permit, item) in permits.zip(items) {
                    permit.send(item);
                }
                Ok(true)
            }
            Err(TrySendError::Full(())) => Ok(false),
            Err(TrySendError::Closed(())) => Err(InventoryError::QueueClosed(self.name.to_string())),
        }
    }

    /// 等待队列至少有 `slots` 个空位，不占用这些空位
    pub async fn wait_for_capacity(&self, slots: usize) -> InventoryResult<()> {
        if slots > self.capacity() {
            return Err(InventoryError::Configuration(format!(
                "队列 {} 的容量 {} 小于所需空位 {}",
                self.name,
                self.capacity(),
                slots
            )));
        }
        self.sender
            .reserve_many(slots)
            .await
            .map(drop)
            .map_err(|_| InventoryError::QueueClosed(self.name.to_string()))
    }

    /// 出队，队列空时等待
    ///
    /// 取消安全：在 `tokio::select!` 中被取消时不会丢失元素。
    pub async fn pop(&self) -> Option<T> {
        self.receiver.lock().await.recv().await
    }

    /// 非阻塞出队
    pub fn try_pop(&self) -> Option<T> {
        self.receiver.try_lock().ok()?.try_recv().ok()
    }

    /// 当前排队元素数量
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}
