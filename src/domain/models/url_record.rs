// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::domain::repositories::object_store::Entity;
use crate::queue::work_queue::Queueable;

/// 已抓取页面
///
/// 每个不同的 URL 字符串对应一行，URL 本身即 ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// 页面地址
    pub url: String,
    /// 所属前缀
    #[serde(default)]
    pub prefix: Option<String>,
    /// 原始 HTML
    #[serde(default)]
    pub raw_content: Option<String>,
    /// 提取后的纯文本
    #[serde(default)]
    pub parsed_content: Option<String>,
}

impl UrlRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// 是否已有非空的解析结果
    pub fn is_parsed(&self) -> bool {
        self.parsed_content
            .as_deref()
            .is_some_and(|content| !content.is_empty())
    }
}

impl Entity for UrlRecord {
    const TYPE_NAME: &'static str = "URL";

    fn id(&self) -> &str {
        &self.url
    }
}

/// URL 队列项
///
/// 队列负载。重新入队时推送的是修改后的副本，从不原地更新。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlQueueItem {
    pub url: UrlRecord,
    /// 最早可处理时间（Unix 秒）
    pub process_from_unix_timestamp: i64,
    /// 已入队次数
    #[serde(default)]
    pub times_queued: u32,
}

impl UrlQueueItem {
    /// 创建一个立即可处理的新队列项
    pub fn new(url: UrlRecord, now: i64) -> Self {
        Self {
            url,
            process_from_unix_timestamp: now,
            times_queued: 0,
        }
    }

    /// 当前时间是否早于计划处理时间
    pub fn is_deferred(&self, now: i64) -> bool {
        now < self.process_from_unix_timestamp
    }

    /// 生成一个延迟处理的副本，入队次数加一
    pub fn requeued(&self, now: i64, delay_secs: i64) -> Self {
        Self {
            url: self.url.clone(),
            process_from_unix_timestamp: now + delay_secs,
            times_queued: self.times_queued + 1,
        }
    }
}

impl Queueable for UrlQueueItem {
    const QUEUE_NAME: &'static str = "queue:urlqueueitem";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_parsed_requires_non_empty_content() {
        let mut record = UrlRecord::new("https://example.com/a");
        assert!(!record.is_parsed());
        record.parsed_content = Some(String::new());
        assert!(!record.is_parsed());
        record.parsed_content = Some("text".to_string());
        assert!(record.is_parsed());
    }

    #[test]
    fn test_requeued_copy_leaves_original_untouched() {
        let item = UrlQueueItem::new(UrlRecord::new("https://example.com/a"), 100);
        let next = item.requeued(200, 30);
        assert_eq!(next.process_from_unix_timestamp, 230);
        assert_eq!(next.times_queued, 1);
        assert_eq!(item.process_from_unix_timestamp, 100);
        assert_eq!(item.times_queued, 0);
    }

    #[test]
    fn test_queue_item_decodes_without_times_queued() {
        let raw = r#"{"url":{"url":"https://example.com/a"},"process_from_unix_timestamp":5}"#;
        let item: UrlQueueItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.times_queued, 0);
        assert!(item.url.prefix.is_none());
    }
}
