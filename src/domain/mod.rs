// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：页面、前缀、解析配置等实体
/// - 仓库接口（repositories）：对象存储抽象和类型化仓库
/// - 服务（services）：抓取调度、内容提取和解析器生成
///
/// 领域层不依赖于 Redis 等具体实现。
pub mod models;
pub mod repositories;
pub mod services;
