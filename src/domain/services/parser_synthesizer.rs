// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::parser_config::ParserConfig;
use crate::domain::models::synthesis_config::SynthesisConfig;
use crate::domain::models::url_prefix::{SampleUrl, UrlPrefix};
use crate::domain::services::extraction_service::{ExtractionService, Parser};
use crate::domain::services::llm_service::{InferenceError, InferenceProvider, InferenceRequest};
use crate::utils::errors::SynthesisError;

/// 修复和反思调用使用的推理强度
const FOLLOW_UP_EFFORT: &str = "minimal";

/// 有原始 HTML 的样本
struct Sample<'a> {
    url: &'a str,
    html: &'a str,
}

impl<'a> Sample<'a> {
    fn from_sample_url(sample: &'a SampleUrl) -> Option<Self> {
        sample.raw_content.as_deref().map(|html| Sample {
            url: &sample.url,
            html,
        })
    }
}

/// 填充输入模板
///
/// 只识别给定名称的 `{name}` 占位符，`{{` 和 `}}` 输出为单个括号，其余字符原样保留。
/// 替换只扫描一遍，填入的值中出现的占位符不会再被替换。
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(&['{', '}'][..]) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        let placeholder = values.iter().find(|(name, _)| {
            tail[1..].starts_with(name) && tail[1 + name.len()..].starts_with('}')
        });
        match placeholder {
            Some((name, value)) if tail.starts_with('{') => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            _ => {
                out.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// 解析器生成器
///
/// 根据前缀的样本页面请求模型生成解析参数，在全部样本上验证，
/// 必要时修复一次，上下文溢出时逐个减少样本数，最后可选地反思合并。
pub struct ParserSynthesizer {
    provider: Arc<dyn InferenceProvider>,
    config: SynthesisConfig,
}

impl ParserSynthesizer {
    pub fn new(provider: Arc<dyn InferenceProvider>, config: SynthesisConfig) -> Self {
        Self { provider, config }
    }

    /// 为前缀生成解析器
    ///
    /// # 错误
    /// * `NoSamples` - 前缀没有带原始 HTML 的样本
    /// * `ContextExhausted` - 样本数减到零仍然溢出
    /// * `ValidationFailed` - 生成（及修复）的配置在某个样本上提取失败
    /// * `Inference` - 其他推理错误，不重试
    pub async fn generate_parser(&self, url_prefix: &UrlPrefix) -> Result<Parser, SynthesisError> {
        let samples: Vec<Sample<'_>> = url_prefix
            .sample_urls
            .iter()
            .filter_map(Sample::from_sample_url)
            .collect();
        if samples.is_empty() {
            return Err(SynthesisError::NoSamples);
        }

        let mut num_examples = samples.len();
        let parser = loop {
            match self.attempt(&url_prefix.prefix, &samples, num_examples).await {
                Ok(parser) => break parser,
                Err(SynthesisError::Inference(InferenceError::ContextOverflow(message))) => {
                    num_examples -= 1;
                    warn!(
                        prefix = %url_prefix.prefix,
                        remaining = num_examples,
                        "Context window exceeded, retrying with fewer samples: {}",
                        message
                    );
                    if num_examples == 0 {
                        return Err(SynthesisError::ContextExhausted);
                    }
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            prefix = %url_prefix.prefix,
            samples = num_examples,
            "Generated parser config"
        );

        match &self.config.reflection_prompt {
            Some(reflection_prompt) => {
                self.reflect(&url_prefix.prefix, &parser, &samples, reflection_prompt)
                    .await
            }
            None => Ok(parser),
        }
    }

    /// 用前 n 个样本生成并验证一次
    async fn attempt(
        &self,
        prefix: &str,
        samples: &[Sample<'_>],
        num_examples: usize,
    ) -> Result<Parser, SynthesisError> {
        let input = self.render_input(&samples[..num_examples], None, None, None);
        let request = self.request(
            self.config.instructions_prompt.clone(),
            input,
            self.config.reasoning_level.clone(),
        );
        let parameters = self.provider.generate(&request).await?;
        let parser = Parser::new(ParserConfig::new(prefix, parameters));

        let Some((failing, message)) = Self::validate(&parser, samples) else {
            return Ok(parser);
        };
        warn!(prefix = prefix, url = failing.url, "Validation failed with error: {}", message);

        let Some(error_prompt) = &self.config.error_prompt else {
            return Err(SynthesisError::ValidationFailed {
                url: failing.url.to_string(),
                message,
            });
        };

        let input = self.render_input(
            std::slice::from_ref(failing),
            Some(&parser.config),
            None,
            Some(&message),
        );
        let request = self.request(
            format!("{}\n{}", self.config.instructions_prompt, error_prompt),
            input,
            FOLLOW_UP_EFFORT.to_string(),
        );
        let parameters = self.provider.generate(&request).await?;
        let repaired = Parser::new(ParserConfig::new(prefix, parameters));

        match Self::validate(&repaired, samples) {
            None => Ok(repaired),
            Some((failing, message)) => Err(SynthesisError::ValidationFailed {
                url: failing.url.to_string(),
                message,
            }),
        }
    }

    /// 在每个样本上试运行，返回第一个失败的样本和错误信息
    fn validate<'s, 'a>(
        parser: &Parser,
        samples: &'s [Sample<'a>],
    ) -> Option<(&'s Sample<'a>, String)> {
        samples.iter().find_map(|sample| {
            parser
                .parse(sample.html)
                .err()
                .map(|e| (sample, e.to_string()))
        })
    }

    /// 逐个样本反思并合并
    async fn reflect(
        &self,
        prefix: &str,
        parser: &Parser,
        samples: &[Sample<'_>],
        reflection_prompt: &str,
    ) -> Result<Parser, SynthesisError> {
        let instructions = format!("{}\n{}", self.config.instructions_prompt, reflection_prompt);
        let mut merged: Option<ParserConfig> = None;

        for sample in samples {
            let parsed = parser.parse(sample.html)?;
            let input = self.render_input(
                std::slice::from_ref(sample),
                Some(&parser.config),
                Some(&parsed),
                None,
            );
            let request = self.request(instructions.clone(), input, FOLLOW_UP_EFFORT.to_string());
            let parameters = self.provider.generate(&request).await?;
            let config = ParserConfig::new(prefix, parameters);

            merged = Some(match merged {
                Some(acc) => acc + config,
                None => config,
            });
        }

        Ok(merged.map(Parser::new).unwrap_or_else(|| parser.clone()))
    }

    fn request(&self, instructions: String, input: String, reasoning_effort: String) -> InferenceRequest {
        InferenceRequest {
            model: self.config.model.clone(),
            instructions,
            input,
            reasoning_effort,
        }
    }

    fn render_input(
        &self,
        samples: &[Sample<'_>],
        previous: Option<&ParserConfig>,
        parsed_content: Option<&str>,
        error_message: Option<&str>,
    ) -> String {
        let html_content = samples
            .iter()
            .map(|sample| ExtractionService::clean_html(sample.html))
            .collect::<Vec<_>>()
            .join("\n");
        let previous = previous
            .map(|config| {
                format!(
                    "Here is the previous parser config: {}",
                    serde_json::to_string(config).unwrap_or_default()
                )
            })
            .unwrap_or_default();
        let parsed_content = parsed_content
            .map(|text| format!("Here is the parsed content based on the previous parser config: {}", text))
            .unwrap_or_default();
        let error_message = error_message
            .map(|message| format!("Here is the error message: {}", message))
            .unwrap_or_default();

        fill_template(
            &self.config.input_prompt_template,
            &[
                ("html_content", &html_content),
                ("previous_parser_config", &previous),
                ("parsed_content", &parsed_content),
                ("error_message", &error_message),
            ],
        )
    }
}

#[cfg(test)]
#[path = "parser_synthesizer_test.rs"]
mod tests;
