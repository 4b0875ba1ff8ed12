// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::object_store::{Entity, ObjectStore, PRODUCTION_CONFIG_KEY, SYSTEM_STATE_KEY};
use crate::domain::models::run_state::RunState;
use crate::domain::models::url_prefix::UrlPrefix;
use crate::domain::models::url_record::UrlRecord;
use crate::utils::errors::StoreError;
use crate::utils::url_utils::candidate_prefixes;

/// 条件写入的最大重试次数
const MAX_CAS_ATTEMPTS: usize = 16;

/// 抓取仓库
///
/// 在原始对象存储之上提供类型化的实体读写、前缀查找和系统指针访问。
/// 所有对 `UrlPrefix` 的读改写都应通过 [`CrawlRepository::update_prefix`]。
#[derive(Clone)]
pub struct CrawlRepository {
    store: Arc<dyn ObjectStore>,
}

impl CrawlRepository {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// 按 ID 读取实体
    pub async fn load<T>(&self, id: &str) -> Result<Option<T>, StoreError>
    where
        T: Entity + DeserializeOwned,
    {
        match self.store.get(T::TYPE_NAME, id).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// 写入实体
    pub async fn save<T>(&self, entity: &T) -> Result<(), StoreError>
    where
        T: Entity + Serialize,
    {
        let raw = serde_json::to_string(entity)?;
        self.store.set(T::TYPE_NAME, entity.id(), &raw).await
    }

    /// 删除实体
    pub async fn delete<T: Entity>(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(T::TYPE_NAME, id).await
    }

    /// 读取某类型的全部实体
    pub async fn scan<T>(&self) -> Result<Vec<T>, StoreError>
    where
        T: Entity + DeserializeOwned,
    {
        let raws = self.store.scan(T::TYPE_NAME).await?;
        let mut entities = Vec::with_capacity(raws.len());
        for raw in raws {
            entities.push(serde_json::from_str(&raw)?);
        }
        Ok(entities)
    }

    pub async fn load_url(&self, url: &str) -> Result<Option<UrlRecord>, StoreError> {
        self.load(url).await
    }

    pub async fn save_url(&self, record: &UrlRecord) -> Result<(), StoreError> {
        self.save(record).await
    }

    pub async fn load_prefix(&self, prefix: &str) -> Result<Option<UrlPrefix>, StoreError> {
        self.load(prefix).await
    }

    pub async fn save_prefix(&self, prefix: &UrlPrefix) -> Result<(), StoreError> {
        self.save(prefix).await
    }

    /// 查找URL所属的已存储前缀，最长的优先
    pub async fn find_prefix_for_url(&self, url: &str) -> Result<Option<UrlPrefix>, StoreError> {
        for candidate in candidate_prefixes(url) {
            if let Some(prefix) = self.load_prefix(&candidate).await? {
                return Ok(Some(prefix));
            }
        }
        Ok(None)
    }

    /// 查找属于某前缀的全部页面
    pub async fn find_urls_with_prefix(&self, prefix: &str) -> Result<Vec<UrlRecord>, StoreError> {
        let records: Vec<UrlRecord> = self.scan().await?;
        Ok(records
            .into_iter()
            .filter(|record| record.prefix.as_deref() == Some(prefix))
            .collect())
    }

    /// 统计属于某前缀的页面数
    pub async fn count_urls_with_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        Ok(self.find_urls_with_prefix(prefix).await?.len())
    }

    /// 读改写一个前缀
    ///
    /// `update` 接收当前值（不存在时为 `None`），返回要写入的新值；
    /// 返回 `None` 表示放弃写入。写入以读取到的原始字节为条件，
    /// 期间被其他进程修改时重新读取并再次调用 `update`。
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(UrlPrefix))` - 写入成功后的值
    /// * `Ok(None)` - `update` 放弃写入
    /// * `Err(StoreError::Conflict)` - 重试次数耗尽
    pub async fn update_prefix<F>(&self, id: &str, mut update: F) -> Result<Option<UrlPrefix>, StoreError>
    where
        F: FnMut(Option<UrlPrefix>) -> Option<UrlPrefix> + Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let raw = self.store.get(UrlPrefix::TYPE_NAME, id).await?;
            let current = match raw.as_deref() {
                Some(raw) => Some(serde_json::from_str::<UrlPrefix>(raw)?),
                None => None,
            };

            let Some(next) = update(current) else {
                return Ok(None);
            };
            if next.prefix != id {
                return Err(StoreError::InvalidValue(format!(
                    "prefix id changed from {} to {}",
                    id, next.prefix
                )));
            }

            let new_raw = serde_json::to_string(&next)?;
            if self
                .store
                .compare_and_set(UrlPrefix::TYPE_NAME, id, raw.as_deref(), &new_raw)
                .await?
            {
                return Ok(Some(next));
            }
            debug!("Prefix {} changed during update, retrying (attempt {})", id, attempt);
        }

        warn!("Giving up on prefix {} after {} conflicting writes", id, MAX_CAS_ATTEMPTS);
        Err(StoreError::Conflict(id.to_string()))
    }

    /// 删除前缀及其全部页面，返回删除的页面数
    ///
    /// 页面包括归属该前缀的记录，以及前缀的样本页面和验证页面
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut urls: Vec<String> = Vec::new();
        if let Some(stored) = self.load_prefix(prefix).await? {
            urls.extend(stored.sample_urls.into_iter().map(|sample| sample.url));
            urls.extend(stored.validation_urls.into_iter().flatten().map(|sample| sample.url));
        }
        urls.extend(
            self.find_urls_with_prefix(prefix)
                .await?
                .into_iter()
                .map(|record| record.url),
        );

        let mut deleted = 0;
        for url in &urls {
            if self.delete::<UrlRecord>(url).await? {
                deleted += 1;
            }
        }
        self.delete::<UrlPrefix>(prefix).await?;
        Ok(deleted)
    }

    /// 读取系统运行状态，未设置时为 RUNNING
    pub async fn run_state(&self) -> Result<RunState, StoreError> {
        match self.store.get_pointer(SYSTEM_STATE_KEY).await? {
            Some(raw) => raw.parse().map_err(StoreError::InvalidValue),
            None => Ok(RunState::default()),
        }
    }

    pub async fn set_run_state(&self, state: RunState) -> Result<(), StoreError> {
        self.store.set_pointer(SYSTEM_STATE_KEY, state.as_str()).await
    }

    /// 系统是否处于运行状态
    pub async fn is_running(&self) -> Result<bool, StoreError> {
        Ok(!self.run_state().await?.is_paused())
    }

    /// 读取生产环境使用的生成配置名称
    pub async fn production_config(&self) -> Result<Option<String>, StoreError> {
        self.store.get_pointer(PRODUCTION_CONFIG_KEY).await
    }

    pub async fn set_production_config(&self, name: &str) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidValue("empty config name".to_string()));
        }
        self.store.set_pointer(PRODUCTION_CONFIG_KEY, name).await
    }
}
