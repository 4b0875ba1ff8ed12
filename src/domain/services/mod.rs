// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 抓取调度服务（crawl_service）：处理 URL 队列项，收集样本或用已有解析器解析
/// - 提取服务（extraction_service）：按解析参数剪枝 DOM 并输出纯文本
/// - LLM服务（llm_service）：调用推理服务生成解析参数
/// - 解析器生成（parser_synthesizer）：生成、验证、修复和反思
/// - 生成任务服务（synthesis_service）：认领前缀并保存生成结果
pub mod crawl_service;
pub mod extraction_service;
pub mod llm_service;
pub mod parser_synthesizer;
pub mod synthesis_service;
