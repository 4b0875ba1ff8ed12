// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::services::llm_service::InferenceError;

/// 对象存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("存储后端错误: {0}")]
    Backend(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("并发写入冲突: {0}")]
    Conflict(String),

    #[error("无效值: {0}")]
    InvalidValue(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// 工作队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("队列后端错误: {0}")]
    Backend(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Backend(err.to_string())
    }
}

/// 内容提取错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("无效选择器: {0}")]
    InvalidSelector(String),
}

/// 解析器生成错误类型
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("前缀没有可用的样本页面")]
    NoSamples,

    #[error("样本数降到零仍然超出上下文长度")]
    ContextExhausted,

    #[error("解析器在 {url} 上验证失败: {message}")]
    ValidationFailed { url: String, message: String },

    #[error("推理错误: {0}")]
    Inference(#[from] InferenceError),

    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    #[error("队列错误: {0}")]
    Queue(#[from] QueueError),

    #[error("内部错误: {0}")]
    InternalError(String),
}
