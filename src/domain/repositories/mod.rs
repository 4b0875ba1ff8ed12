// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库模块
///
/// - 对象存储（object_store）：键值存储的抽象契约，具体实现由基础设施层提供
/// - 抓取仓库（crawl_repository）：页面、前缀和系统指针的类型化访问
pub mod crawl_repository;
pub mod object_store;

pub use crawl_repository::CrawlRepository;
pub use object_store::{Entity, ObjectStore};
