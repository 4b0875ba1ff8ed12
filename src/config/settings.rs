// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::services::crawl_service::FrontierPolicy;

/// 应用程序配置设置
///
/// 包含 Redis、抓取工作器、解析器生成工作器和推理服务等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Redis配置
    pub redis: RedisSettings,
    /// 抓取工作器配置
    pub crawler: CrawlerSettings,
    /// 解析器生成配置
    pub synthesis: SynthesisSettings,
    /// 推理服务配置
    pub llm: LlmSettings,
}

/// Redis配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
}

/// 抓取工作器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 请求使用的 User-Agent
    pub user_agent: String,
    /// 抓取超时时间（秒）
    pub fetch_timeout_secs: u64,
    /// 每个前缀最多保存的页面数
    pub prefix_url_cap: usize,
    /// 没有解析器时重新入队的延迟（秒）
    pub requeue_delay_secs: i64,
    /// 队列为空时的等待时间（毫秒）
    pub idle_backoff_ms: u64,
    /// 系统暂停时的等待时间（毫秒）
    pub paused_backoff_ms: u64,
    /// 每处理一项后的等待时间（毫秒）
    pub item_backoff_ms: u64,
    /// 队首项未到处理时间时的等待时间（毫秒）
    pub deferred_backoff_ms: u64,
}

impl CrawlerSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn frontier_policy(&self) -> FrontierPolicy {
        FrontierPolicy {
            prefix_url_cap: self.prefix_url_cap,
            requeue_delay_secs: self.requeue_delay_secs,
        }
    }
}

/// 解析器生成配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisSettings {
    /// 生成配置（YAML）所在目录
    pub configs_dir: PathBuf,
    /// 队列为空时的等待时间（毫秒）
    pub idle_backoff_ms: u64,
    /// 系统暂停时的等待时间（毫秒）
    pub paused_backoff_ms: u64,
    /// 每个任务完成后的等待时间（毫秒）
    pub job_backoff_ms: u64,
}

/// 推理服务配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// API 密钥
    pub api_key: Option<String>,
    /// API 基础地址
    pub api_base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值。
    /// 未配置 API 密钥时读取 `OPENAI_API_KEY`。
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings = Self::load(None)?;
        if settings.llm.api_key.is_none() {
            settings.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        Ok(settings)
    }

    /// 加载配置
    ///
    /// `env` 为 `Some` 时用给定的变量表代替进程环境变量
    pub fn load(env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let app_env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("redis.url", "redis://localhost:6379/0")?
            // Crawler defaults
            .set_default("crawler.user_agent", "parser-generator/1.0")?
            .set_default("crawler.fetch_timeout_secs", 30)?
            .set_default("crawler.prefix_url_cap", 20)?
            .set_default("crawler.requeue_delay_secs", 30)?
            .set_default("crawler.idle_backoff_ms", 1000)?
            .set_default("crawler.paused_backoff_ms", 1000)?
            .set_default("crawler.item_backoff_ms", 1000)?
            .set_default("crawler.deferred_backoff_ms", 50)?
            // Synthesis defaults
            .set_default("synthesis.configs_dir", "configs")?
            .set_default("synthesis.idle_backoff_ms", 1000)?
            .set_default("synthesis.paused_backoff_ms", 5000)?
            .set_default("synthesis.job_backoff_ms", 1000)?
            // LLM defaults
            .set_default("llm.api_base_url", "https://api.openai.com/v1")?
            .set_default("llm.timeout_secs", 120)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(
                Environment::with_prefix("PARSEGEN")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
