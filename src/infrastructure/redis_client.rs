// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::domain::repositories::object_store::{entity_key, ObjectStore};
use crate::queue::work_queue::WorkQueue;
use crate::utils::errors::{QueueError, StoreError};

/// 条件写入脚本
///
/// ARGV[1] 为 '0' 时要求键不存在，否则要求当前值等于 ARGV[2]
const COMPARE_AND_SET_SCRIPT: &str = r#"
    local current = redis.call('GET', KEYS[1])
    if ARGV[1] == '0' then
        if current then
            return 0
        end
    elseif current ~= ARGV[2] then
        return 0
    end
    redis.call('SET', KEYS[1], ARGV[3])
    return 1
"#;

/// Redis客户端
///
/// 同时实现对象存储和工作队列。实体保存在 `model:{类型名}:{ID}`，
/// 队列是按类型命名的列表，左侧推入右侧弹出。
#[derive(Clone)]
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    async fn type_keys(
        con: &mut redis::aio::MultiplexedConnection,
        type_name: &str,
    ) -> Result<Vec<String>, redis::RedisError> {
        let pattern = format!("model:{}:*", type_name);
        let mut keys: Vec<String> = con.keys(&pattern).await?;
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for RedisClient {
    async fn get(&self, type_name: &str, id: &str) -> Result<Option<String>, StoreError> {
        let mut con = self.connection().await?;
        let value: Option<String> = con.get(entity_key(type_name, id)).await?;
        Ok(value)
    }

    async fn set(&self, type_name: &str, id: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        con.set::<_, _, ()>(entity_key(type_name, id), value).await?;
        Ok(())
    }

    async fn delete(&self, type_name: &str, id: &str) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let removed: usize = con.del(entity_key(type_name, id)).await?;
        Ok(removed > 0)
    }

    async fn scan(&self, type_name: &str) -> Result<Vec<String>, StoreError> {
        let mut con = self.connection().await?;
        let keys = Self::type_keys(&mut con, type_name).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        // Keys can expire or be deleted between KEYS and MGET
        let values: Vec<Option<String>> = con.mget(&keys).await?;
        Ok(values.into_iter().flatten().collect())
    }

    async fn compare_and_set(
        &self,
        type_name: &str,
        id: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let swapped: i32 = redis::Script::new(COMPARE_AND_SET_SCRIPT)
            .key(entity_key(type_name, id))
            .arg(if expected.is_some() { "1" } else { "0" })
            .arg(expected.unwrap_or(""))
            .arg(value)
            .invoke_async(&mut con)
            .await?;
        Ok(swapped == 1)
    }

    async fn get_pointer(&self, name: &str) -> Result<Option<String>, StoreError> {
        let mut con = self.connection().await?;
        let value: Option<String> = con.get(name).await?;
        Ok(value)
    }

    async fn set_pointer(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        con.set::<_, _, ()>(name, value).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for RedisClient {
    async fn push(&self, queue: &str, payload: &str) -> Result<(), QueueError> {
        let mut con = self.connection().await?;
        con.lpush::<_, _, ()>(queue, payload).await?;
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<String>, QueueError> {
        let mut con = self.connection().await?;
        let payload: Option<String> = con.rpop(queue, None).await?;
        Ok(payload)
    }

    async fn len(&self, queue: &str) -> Result<usize, QueueError> {
        let mut con = self.connection().await?;
        let len: usize = con.llen(queue).await?;
        Ok(len)
    }

    async fn clear(&self, queue: &str) -> Result<(), QueueError> {
        let mut con = self.connection().await?;
        con.del::<_, ()>(queue).await?;
        Ok(())
    }
}
