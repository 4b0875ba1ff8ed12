// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::models::parser_config::ParserConfig;
use crate::domain::repositories::object_store::Entity;
use crate::queue::work_queue::Queueable;

/// 前缀处理状态
///
/// 状态只能向前推进：
/// None → InProgress → Completed/Failed
/// 例外是显式的 Failed → None 重置，以及运维强制重新生成时把前缀重置为 None。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// 尚未处理
    #[default]
    None,
    /// 正在生成解析器
    InProgress,
    /// 已生成解析器
    Completed,
    /// 生成失败，下次出队时重置
    Failed,
}

impl ProcessingStatus {
    /// 判断状态迁移是否合法
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (None, InProgress) | (InProgress, Completed) | (InProgress, Failed) | (Failed, None)
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessingStatus::None => write!(f, "none"),
            ProcessingStatus::InProgress => write!(f, "in_progress"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 验证标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLabel {
    /// 人工标注的期望文本
    pub content: String,
}

/// 样本页面
///
/// 作为解析器生成的输入，或带标签作为验证用例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleUrl {
    pub url: String,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub label: Option<ValidationLabel>,
}

impl SampleUrl {
    pub fn new(url: impl Into<String>, raw_content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            raw_content: Some(raw_content.into()),
            label: None,
        }
    }

    /// 附加验证标签
    pub fn with_label(mut self, content: impl Into<String>) -> Self {
        self.label = Some(ValidationLabel {
            content: content.into(),
        });
        self
    }
}

/// URL 前缀
///
/// 解析器生成的基本单位。前缀字符串即 ID，按字面值处理，不做规范化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPrefix {
    pub prefix: String,
    #[serde(default)]
    pub sample_urls: Vec<SampleUrl>,
    #[serde(default)]
    pub validation_urls: Option<Vec<SampleUrl>>,
    #[serde(default)]
    pub parser_config: Option<ParserConfig>,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
}

impl UrlPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sample_urls: Vec::new(),
            validation_urls: None,
            parser_config: None,
            processing_status: ProcessingStatus::None,
        }
    }

    /// 追加样本页面
    ///
    /// 同一 URL 已经存在时不重复添加，返回是否实际追加。
    pub fn add_sample(&mut self, sample: SampleUrl) -> bool {
        if self.sample_urls.iter().any(|s| s.url == sample.url) {
            return false;
        }
        self.sample_urls.push(sample);
        true
    }

    /// 带标签的验证页面
    pub fn labeled_validation_urls(&self) -> impl Iterator<Item = &SampleUrl> {
        self.validation_urls
            .iter()
            .flatten()
            .filter(|sample| sample.label.is_some())
    }
}

impl Entity for UrlPrefix {
    const TYPE_NAME: &'static str = "URLPrefix";

    fn id(&self) -> &str {
        &self.prefix
    }
}

impl Queueable for UrlPrefix {
    const QUEUE_NAME: &'static str = "queue:urlprefix";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use ProcessingStatus::*;
        assert!(None.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(Failed.can_transition_to(None));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(None));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let raw = serde_json::to_string(&ProcessingStatus::InProgress).unwrap();
        assert_eq!(raw, "\"in_progress\"");
        assert_eq!(ProcessingStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_add_sample_skips_duplicate_urls() {
        let mut prefix = UrlPrefix::new("https://example.com/docs");
        assert!(prefix.add_sample(SampleUrl::new("https://example.com/docs/a", "<p>a</p>")));
        assert!(!prefix.add_sample(SampleUrl::new("https://example.com/docs/a", "<p>b</p>")));
        assert_eq!(prefix.sample_urls.len(), 1);
    }

    #[test]
    fn test_prefix_decodes_with_defaults() {
        let prefix: UrlPrefix = serde_json::from_str(r#"{"prefix":"https://example.com"}"#).unwrap();
        assert!(prefix.sample_urls.is_empty());
        assert_eq!(prefix.processing_status, ProcessingStatus::None);
        assert!(prefix.parser_config.is_none());
    }
}
