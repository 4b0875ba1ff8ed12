// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::errors::SynthesisError;

fn default_reasoning_level() -> String {
    "minimal".to_string()
}

/// 解析器生成配置
///
/// 按名称加载，生产环境使用的名称由存储中的单例指针决定。
/// `input_prompt_template` 支持以下占位符：
/// - `{html_content}` - 清洗后的样本 HTML
/// - `{previous_parser_config}` - 上一次生成的配置
/// - `{parsed_content}` - 按上一次配置提取出的文本
/// - `{error_message}` - 验证失败的错误信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub config_name: String,
    /// 模型标识
    #[serde(alias = "openai_model")]
    pub model: String,
    /// 推理强度
    #[serde(default = "default_reasoning_level")]
    pub reasoning_level: String,
    pub instructions_prompt: String,
    pub input_prompt_template: String,
    /// 修复提示词，未配置时不做修复调用
    #[serde(default)]
    pub error_prompt: Option<String>,
    /// 反思提示词，未配置时不做反思合并
    #[serde(default)]
    pub reflection_prompt: Option<String>,
}

/// 配置加载器
///
/// 从目录中读取 `{name}.yaml`
#[derive(Debug, Clone)]
pub struct SynthesisConfigLoader {
    dir: PathBuf,
}

impl SynthesisConfigLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 按名称加载配置，文件名覆盖 YAML 中的 `config_name`
    pub fn load(&self, name: &str) -> Result<SynthesisConfig, SynthesisError> {
        let path = self.dir.join(format!("{}.yaml", name));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            SynthesisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: SynthesisConfig = serde_yaml::from_str(&raw).map_err(|e| {
            SynthesisError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.config_name = name.to_string();
        Ok(config)
    }

    /// 列出目录中所有可用的配置名称
    pub fn list(&self) -> Result<Vec<String>, SynthesisError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            SynthesisError::Config(format!("cannot list {}: {}", self.dir.display(), e))
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("yaml") {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .map(str::to_string)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }
}
