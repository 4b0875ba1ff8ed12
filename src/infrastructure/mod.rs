// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 提供对象存储和工作队列的具体实现：
/// - Redis（redis_client）：多进程共享的生产后端
/// - 内存（memory）：单进程后端，用于测试和本地运行
pub mod memory;
pub mod redis_client;

pub use memory::{InMemoryQueue, InMemoryStore};
pub use redis_client::RedisClient;
