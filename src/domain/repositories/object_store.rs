// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::utils::errors::StoreError;

/// 生产环境解析器生成配置名称的指针键
pub const PRODUCTION_CONFIG_KEY: &str = "production_config";

/// 系统运行状态的指针键
pub const SYSTEM_STATE_KEY: &str = "system_state";

/// 可存储实体
///
/// 每个实体类型有一个固定的类型名，实体按 `(类型名, ID)` 存储
pub trait Entity {
    const TYPE_NAME: &'static str;

    fn id(&self) -> &str;
}

/// 实体在键值存储中的键
pub fn entity_key(type_name: &str, id: &str) -> String {
    format!("model:{}:{}", type_name, id)
}

/// 对象存储特质
///
/// 以原始 JSON 字符串读写实体，类型化的读写由 `CrawlRepository` 负责。
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 读取实体
    async fn get(&self, type_name: &str, id: &str) -> Result<Option<String>, StoreError>;

    /// 写入实体，覆盖已有值
    async fn set(&self, type_name: &str, id: &str, value: &str) -> Result<(), StoreError>;

    /// 删除实体，返回是否存在
    async fn delete(&self, type_name: &str, id: &str) -> Result<bool, StoreError>;

    /// 读取某类型的全部实体
    async fn scan(&self, type_name: &str) -> Result<Vec<String>, StoreError>;

    /// 条件写入
    ///
    /// 仅当当前存储值与 `expected` 完全相同时写入 `value`；
    /// `expected` 为 `None` 表示要求键不存在。返回是否写入成功。
    async fn compare_and_set(
        &self,
        type_name: &str,
        id: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError>;

    /// 读取单例指针
    async fn get_pointer(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// 写入单例指针
    async fn set_pointer(&self, name: &str, value: &str) -> Result<(), StoreError>;
}
