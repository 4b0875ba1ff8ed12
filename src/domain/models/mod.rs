// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 页面记录（url_record）：已抓取页面和 URL 队列项
/// - URL 前缀（url_prefix）：样本页面、验证页面和处理状态
/// - 解析配置（parser_config）：选择器集合及其合并规则
/// - 生成配置（synthesis_config）：提示词和模型参数
/// - 评估（evaluation）：解析结果与标签的比较
/// - 运行状态（run_state）：全局暂停开关
pub mod evaluation;
pub mod parser_config;
pub mod run_state;
pub mod synthesis_config;
pub mod url_prefix;
pub mod url_record;

pub use evaluation::{EvaluationResult, EvaluationSummary};
pub use parser_config::{ParserConfig, ParserParameters};
pub use run_state::RunState;
pub use synthesis_config::{SynthesisConfig, SynthesisConfigLoader};
pub use url_prefix::{ProcessingStatus, SampleUrl, UrlPrefix, ValidationLabel};
pub use url_record::{UrlQueueItem, UrlRecord};
