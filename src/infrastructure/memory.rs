// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::domain::repositories::object_store::{entity_key, ObjectStore};
use crate::queue::work_queue::WorkQueue;
use crate::utils::errors::{QueueError, StoreError};

/// 内存对象存储
///
/// 单进程使用，主要用于测试和本地运行。条件写入依赖 DashMap 分片锁保证原子性。
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, String>,
    pointers: DashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn type_prefix(type_name: &str) -> String {
        format!("model:{}:", type_name)
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, type_name: &str, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .get(&entity_key(type_name, id))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, type_name: &str, id: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .insert(entity_key(type_name, id), value.to_string());
        Ok(())
    }

    async fn delete(&self, type_name: &str, id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(&entity_key(type_name, id)).is_some())
    }

    async fn scan(&self, type_name: &str) -> Result<Vec<String>, StoreError> {
        let prefix = Self::type_prefix(type_name);
        let mut matched: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        matched.sort();
        Ok(matched.into_iter().map(|(_, value)| value).collect())
    }

    async fn compare_and_set(
        &self,
        type_name: &str,
        id: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        match self.entries.entry(entity_key(type_name, id)) {
            Entry::Occupied(mut occupied) => {
                if expected == Some(occupied.get().as_str()) {
                    occupied.insert(value.to_string());
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                if expected.is_none() {
                    vacant.insert(value.to_string());
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn get_pointer(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.pointers.get(name).map(|entry| entry.value().clone()))
    }

    async fn set_pointer(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.pointers.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// 内存工作队列
#[derive(Default)]
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for InMemoryQueue {
    async fn push(&self, queue: &str, payload: &str) -> Result<(), QueueError> {
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<String>, QueueError> {
        Ok(self
            .queues
            .lock()
            .get_mut(queue)
            .and_then(|items| items.pop_front()))
    }

    async fn len(&self, queue: &str) -> Result<usize, QueueError> {
        Ok(self.queues.lock().get(queue).map_or(0, |items| items.len()))
    }

    async fn clear(&self, queue: &str) -> Result<(), QueueError> {
        self.queues.lock().remove(queue);
        Ok(())
    }
}
