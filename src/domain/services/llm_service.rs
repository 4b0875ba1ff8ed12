// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::parser_config::ParserParameters;

/// 表示输入超出模型上下文窗口的错误码
const CONTEXT_OVERFLOW_CODE: &str = "context_length_exceeded";

/// 推理错误类型
#[derive(Error, Debug)]
pub enum InferenceError {
    /// 输入超出模型上下文窗口，减少样本后可以重试
    #[error("Input exceeds the model context window: {0}")]
    ContextOverflow(String),
    /// 服务端返回的其他错误
    #[error("LLM API returned error (status {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// 网络错误
    #[error("Failed to send request to LLM API: {0}")]
    Transport(#[from] reqwest::Error),
    /// 输出不符合解析参数结构
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
    #[error("LLM API key not configured")]
    MissingApiKey,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// 一次结构化输出请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    pub model: String,
    pub instructions: String,
    pub input: String,
    /// 推理强度，如 `minimal`、`low`
    pub reasoning_effort: String,
}

/// 推理服务特质
///
/// 一次调用返回一组经过严格结构校验的解析参数
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn generate(&self, request: &InferenceRequest) -> Result<ParserParameters, InferenceError>;
}

/// OpenAI 推理服务
///
/// 使用 Responses API 的 `json_schema` 严格输出格式
pub struct OpenAiProvider {
    api_key: Option<String>,
    api_base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: Option<String>,
        api_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn request_body(request: &InferenceRequest) -> Value {
        json!({
            "model": request.model,
            "instructions": request.instructions,
            "input": request.input,
            "reasoning": { "effort": request.reasoning_effort },
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": "parser_config",
                    "strict": true,
                    "schema": ParserParameters::json_schema(),
                }
            }
        })
    }

    /// 将错误对象映射为推理错误
    fn api_error(status: u16, error: &Value) -> InferenceError {
        let code = error["code"].as_str().map(str::to_string);
        let message = error["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();

        if code.as_deref() == Some(CONTEXT_OVERFLOW_CODE) {
            InferenceError::ContextOverflow(message)
        } else {
            InferenceError::Api {
                status,
                code,
                message,
            }
        }
    }

    /// 拼接所有 `output_text` 片段
    fn output_text(body: &Value) -> String {
        body["output"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|item| item["content"].as_array())
            .flatten()
            .filter(|content| content["type"] == "output_text")
            .filter_map(|content| content["text"].as_str())
            .collect()
    }

    fn usage(body: &Value) -> TokenUsage {
        let usage = &body["usage"];
        TokenUsage {
            input_tokens: usage["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: usage["output_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
        }
    }
}

#[async_trait]
impl InferenceProvider for OpenAiProvider {
    /// 请求模型生成解析参数
    ///
    /// # 错误
    /// * `ContextOverflow` - 错误码为 `context_length_exceeded`
    /// * `Api` - 其他服务端错误
    /// * `InvalidOutput` - 输出为空或不符合结构
    async fn generate(&self, request: &InferenceRequest) -> Result<ParserParameters, InferenceError> {
        let api_key = self.api_key.as_ref().ok_or(InferenceError::MissingApiKey)?;

        let url = format!("{}/responses", self.api_base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&Self::request_body(request))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), &body["error"]));
        }
        if body["error"].is_object() {
            return Err(Self::api_error(status.as_u16(), &body["error"]));
        }

        let usage = Self::usage(&body);
        debug!(
            model = %request.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "LLM response received"
        );

        let text = Self::output_text(&body);
        if text.trim().is_empty() {
            return Err(InferenceError::InvalidOutput("empty output".to_string()));
        }
        serde_json::from_str::<ParserParameters>(&text)
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))
    }
}
