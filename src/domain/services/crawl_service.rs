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

use crate::domain::models::url_prefix::{SampleUrl, UrlPrefix};
use crate::domain::models::url_record::{UrlQueueItem, UrlRecord};
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::domain::services::extraction_service::Parser;
use crate::engines::traits::PageFetcher;
use crate::queue::work_queue::JobQueue;
use crate::utils::errors::WorkerError;
use crate::utils::url_utils::{derive_prefix, normalize_url, resolve_url};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// 抓取调度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierPolicy {
    /// 每个前缀最多保存的页面数
    pub prefix_url_cap: usize,
    /// 没有解析器时重新入队的延迟（秒）
    pub requeue_delay_secs: i64,
}

impl Default for FrontierPolicy {
    fn default() -> Self {
        Self {
            prefix_url_cap: 20,
            requeue_delay_secs: 30,
        }
    }
}

/// 单个队列项的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// 未到处理时间，原样放回队尾
    Deferred,
    /// 前缀页面数已达上限，丢弃
    Dropped { prefix: String, url_count: usize },
    /// 页面已经解析过
    Skipped,
    /// 已解析并保存，同前缀的外链已入队
    Success { prefix: String, enqueued: usize },
    /// 已作为样本加入前缀，延迟后重新入队
    Requeued {
        prefix: String,
        next_process_time: i64,
        times_queued: u32,
    },
    /// 抓取或提取失败，队列项被丢弃
    Error { reason: String },
}

impl ProcessOutcome {
    /// 结果标签，用于日志和指标
    pub fn label(&self) -> &'static str {
        match self {
            ProcessOutcome::Deferred => "deferred",
            ProcessOutcome::Dropped { .. } => "dropped",
            ProcessOutcome::Skipped => "skipped",
            ProcessOutcome::Success { .. } => "success",
            ProcessOutcome::Requeued { .. } => "requeued",
            ProcessOutcome::Error { .. } => "error",
        }
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessOutcome::Dropped { prefix, url_count } => write!(
                f,
                "dropped: prefix {} already has {} URLs",
                prefix, url_count
            ),
            ProcessOutcome::Success { prefix, enqueued } => {
                write!(f, "success: prefix {}, {} URLs added to queue", prefix, enqueued)
            }
            ProcessOutcome::Requeued {
                prefix,
                next_process_time,
                times_queued,
            } => write!(
                f,
                "requeued: sample added to {}, next at {} (times_queued: {})",
                prefix, next_process_time, times_queued
            ),
            ProcessOutcome::Error { reason } => write!(f, "error: {}", reason),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// 抓取调度服务
///
/// 处理 URL 队列项：延迟、丢弃、用已有解析器解析，或者把页面作为样本交给解析器生成
pub struct FrontierService {
    repo: CrawlRepository,
    queue: JobQueue,
    fetcher: Arc<dyn PageFetcher>,
    policy: FrontierPolicy,
}

impl FrontierService {
    pub fn new(
        repo: CrawlRepository,
        queue: JobQueue,
        fetcher: Arc<dyn PageFetcher>,
        policy: FrontierPolicy,
    ) -> Self {
        Self {
            repo,
            queue,
            fetcher,
            policy,
        }
    }

    /// 处理一个队列项
    ///
    /// # 参数
    ///
    /// * `item` - 出队的队列项
    /// * `now` - 当前 Unix 时间（秒）
    ///
    /// # 返回值
    ///
    /// * `Ok(ProcessOutcome)` - 处理结果，抓取和提取失败也在其中
    /// * `Err(WorkerError)` - 存储或队列错误
    #[instrument(skip(self, item), fields(url = %item.url.url))]
    pub async fn process_item(&self, item: UrlQueueItem, now: i64) -> Result<ProcessOutcome, WorkerError> {
        if item.is_deferred(now) {
            self.queue.push(&item).await?;
            return Ok(ProcessOutcome::Deferred);
        }

        let url_prefix = self.repo.find_prefix_for_url(&item.url.url).await?;

        if let Some(prefix) = &url_prefix {
            let url_count = self.repo.count_urls_with_prefix(&prefix.prefix).await?;
            if url_count >= self.policy.prefix_url_cap {
                info!(
                    "Dropping URL {} from queue - prefix {} already has {} URLs (limit: {})",
                    item.url.url, prefix.prefix, url_count, self.policy.prefix_url_cap
                );
                return Ok(ProcessOutcome::Dropped {
                    prefix: prefix.prefix.clone(),
                    url_count,
                });
            }
        }

        match url_prefix {
            Some(prefix) if prefix.parser_config.is_some() => {
                self.parse_with_existing(item, prefix, now).await
            }
            _ => self.collect_sample(item, now).await,
        }
    }

    /// 用前缀已有的解析器处理页面
    async fn parse_with_existing(
        &self,
        item: UrlQueueItem,
        prefix: UrlPrefix,
        now: i64,
    ) -> Result<ProcessOutcome, WorkerError> {
        let url = item.url.url;
        let Some(config) = prefix.parser_config else {
            return Ok(ProcessOutcome::Error {
                reason: format!("prefix {} has no parser config", prefix.prefix),
            });
        };

        if let Some(existing) = self.repo.load_url(&url).await? {
            if existing.is_parsed() {
                debug!("URL {} already exists and has been parsed, skipping", url);
                return Ok(ProcessOutcome::Skipped);
            }
        }

        let raw_content = match self.fetcher.fetch(&url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to load HTML for {}: {}", url, e);
                return Ok(ProcessOutcome::Error {
                    reason: format!("Failed to load HTML: {}", e),
                });
            }
        };

        let parsed_content = match Parser::new(config).parse(&raw_content) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to parse content for {}: {}", url, e);
                return Ok(ProcessOutcome::Error {
                    reason: format!("Failed to parse content: {}", e),
                });
            }
        };

        let outlinks = LinkDiscoverer::extract_outlinks(&raw_content, &url, &prefix.prefix);

        self.repo
            .save_url(&UrlRecord {
                url: url.clone(),
                prefix: Some(prefix.prefix.clone()),
                raw_content: Some(raw_content),
                parsed_content: Some(parsed_content),
            })
            .await?;

        let mut enqueued = 0;
        for link in outlinks {
            if let Some(existing) = self.repo.load_url(&link).await? {
                if existing.is_parsed() {
                    continue;
                }
            }
            let record = UrlRecord {
                url: link,
                prefix: Some(prefix.prefix.clone()),
                raw_content: None,
                parsed_content: None,
            };
            self.queue.push(&UrlQueueItem::new(record, now)).await?;
            enqueued += 1;
        }

        if enqueued > 0 {
            info!("Added {} URLs with shared prefix {} to queue", enqueued, prefix.prefix);
        }

        Ok(ProcessOutcome::Success {
            prefix: prefix.prefix,
            enqueued,
        })
    }

    /// 把页面作为样本加入最深前缀，交给解析器生成后延迟重试
    async fn collect_sample(&self, item: UrlQueueItem, now: i64) -> Result<ProcessOutcome, WorkerError> {
        let url = item.url.url.clone();
        let raw_content = match self.fetcher.fetch(&url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to load HTML for {}: {}", url, e);
                return Ok(ProcessOutcome::Error {
                    reason: format!("Failed to create URLPrefix: {}", e),
                });
            }
        };

        let deepest_prefix = derive_prefix(&url);
        let sample = SampleUrl::new(url.clone(), raw_content);

        let updated = self
            .repo
            .update_prefix(&deepest_prefix, |current| {
                let mut prefix = current.unwrap_or_else(|| UrlPrefix::new(deepest_prefix.as_str()));
                if !prefix.add_sample(sample.clone()) {
                    debug!("Sample {} already recorded for {}", sample.url, prefix.prefix);
                }
                Some(prefix)
            })
            .await?;

        if let Some(prefix) = &updated {
            self.queue.push(prefix).await?;
            info!(
                "Added sample {} to prefix {} ({} samples)",
                url,
                prefix.prefix,
                prefix.sample_urls.len()
            );
        }

        let requeued = item.requeued(now, self.policy.requeue_delay_secs);
        self.queue.push(&requeued).await?;
        info!(
            "Re-queued URL {} for processing in {} seconds (times_queued: {})",
            url, self.policy.requeue_delay_secs, requeued.times_queued
        );

        Ok(ProcessOutcome::Requeued {
            prefix: deepest_prefix,
            next_process_time: requeued.process_from_unix_timestamp,
            times_queued: requeued.times_queued,
        })
    }
}

/// 链接发现器
///
/// 负责从HTML内容中提取同前缀的外链
pub struct LinkDiscoverer;

impl LinkDiscoverer {
    /// 提取同前缀的外链
    ///
    /// 相对地址按 `base_url` 解析，去掉片段并规范化；只保留 http/https、
    /// 以 `target_prefix` 开头且不等于 `base_url` 本身的链接，按首次出现顺序去重。
    ///
    /// # 参数
    ///
    /// * `html_content` - HTML内容
    /// * `base_url` - 页面地址
    /// * `target_prefix` - 目标前缀
    pub fn extract_outlinks(html_content: &str, base_url: &str, target_prefix: &str) -> Vec<String> {
        let base = match Url::parse(base_url) {
            Ok(base) => base,
            Err(e) => {
                debug!("Cannot resolve links against {}: {}", base_url, e);
                return Vec::new();
            }
        };
        let normalized_base = normalize_url(base_url);
        let document = Html::parse_document(html_content);

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&ANCHOR_SELECTOR) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(mut absolute) = resolve_url(&base, href.trim()) else {
                continue;
            };
            absolute.set_fragment(None);

            if absolute.scheme() != "http" && absolute.scheme() != "https" {
                continue;
            }

            let normalized = normalize_url(absolute.as_str());
            if normalized == normalized_base || !normalized.starts_with(target_prefix) {
                continue;
            }

            if seen.insert(normalized.clone()) {
                links.push(normalized);
            }
        }

        links
    }
}

#[cfg(test)]
#[path = "crawl_service_test.rs"]
mod tests;
