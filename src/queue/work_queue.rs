// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::utils::errors::QueueError;

/// 可入队的负载类型
///
/// 每种类型对应一个独立的先进先出列表
pub trait Queueable {
    const QUEUE_NAME: &'static str;
}

/// 工作队列特质
///
/// 先进先出、至少一次投递。负载为原始 JSON 字符串。
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// 追加到队尾
    async fn push(&self, queue: &str, payload: &str) -> Result<(), QueueError>;

    /// 从队头取出，队列为空时返回 `None`
    async fn pop(&self, queue: &str) -> Result<Option<String>, QueueError>;

    /// 队列长度
    async fn len(&self, queue: &str) -> Result<usize, QueueError>;

    /// 清空队列
    async fn clear(&self, queue: &str) -> Result<(), QueueError>;
}

/// 类型化的任务队列
///
/// 按负载类型选择列表，并负责 JSON 编解码
#[derive(Clone)]
pub struct JobQueue {
    backend: Arc<dyn WorkQueue>,
}

impl JobQueue {
    pub fn new(backend: Arc<dyn WorkQueue>) -> Self {
        Self { backend }
    }

    /// 入队
    pub async fn push<T>(&self, item: &T) -> Result<(), QueueError>
    where
        T: Queueable + Serialize + Sync,
    {
        let payload = serde_json::to_string(item)?;
        self.backend.push(T::QUEUE_NAME, &payload).await
    }

    /// 出队
    ///
    /// 无法解码的负载已经从队列移除，以错误形式返回
    pub async fn pop<T>(&self) -> Result<Option<T>, QueueError>
    where
        T: Queueable + DeserializeOwned,
    {
        match self.backend.pop(T::QUEUE_NAME).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn len<T: Queueable>(&self) -> Result<usize, QueueError> {
        self.backend.len(T::QUEUE_NAME).await
    }

    pub async fn clear<T: Queueable>(&self) -> Result<(), QueueError> {
        self.backend.clear(T::QUEUE_NAME).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::url_prefix::UrlPrefix;
    use crate::domain::models::url_record::{UrlQueueItem, UrlRecord};
    use crate::infrastructure::memory::InMemoryQueue;

    #[tokio::test]
    async fn test_fifo_per_type() {
        let queue = JobQueue::new(Arc::new(InMemoryQueue::new()));

        queue
            .push(&UrlQueueItem::new(UrlRecord::new("https://a.com/1"), 0))
            .await
            .unwrap();
        queue
            .push(&UrlQueueItem::new(UrlRecord::new("https://a.com/2"), 0))
            .await
            .unwrap();
        queue.push(&UrlPrefix::new("https://a.com")).await.unwrap();

        assert_eq!(queue.len::<UrlQueueItem>().await.unwrap(), 2);
        assert_eq!(queue.len::<UrlPrefix>().await.unwrap(), 1);

        let first: UrlQueueItem = queue.pop().await.unwrap().unwrap();
        let second: UrlQueueItem = queue.pop().await.unwrap().unwrap();
        assert_eq!(first.url.url, "https://a.com/1");
        assert_eq!(second.url.url, "https://a.com/2");
        assert!(queue.pop::<UrlQueueItem>().await.unwrap().is_none());

        queue.clear::<UrlPrefix>().await.unwrap();
        assert_eq!(queue.len::<UrlPrefix>().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_an_error() {
        let backend = Arc::new(InMemoryQueue::new());
        backend.push(UrlPrefix::QUEUE_NAME, "{not json").await.unwrap();
        let queue = JobQueue::new(backend);
        assert!(matches!(
            queue.pop::<UrlPrefix>().await,
            Err(QueueError::Serialization(_))
        ));
        assert_eq!(queue.len::<UrlPrefix>().await.unwrap(), 0);
    }
}
