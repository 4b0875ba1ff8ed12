// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 页面抓取
pub mod engines;

/// 基础设施模块
///
/// Redis 和内存两种存储、队列后端
pub mod infrastructure;

/// 表示层模块
///
/// 命令行操作界面
pub mod presentation;

/// 队列模块
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 抓取和解析器生成两个后台循环
pub mod workers;
