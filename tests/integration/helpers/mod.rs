// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use parsegen::domain::models::parser_config::ParserParameters;
use parsegen::domain::models::synthesis_config::SynthesisConfigLoader;
use parsegen::domain::repositories::crawl_repository::CrawlRepository;
use parsegen::domain::services::crawl_service::{FrontierPolicy, FrontierService};
use parsegen::domain::services::llm_service::{
    InferenceError, InferenceProvider, InferenceRequest,
};
use parsegen::domain::services::synthesis_service::SynthesisService;
use parsegen::engines::traits::{FetchError, PageFetcher};
use parsegen::infrastructure::memory::{InMemoryQueue, InMemoryStore};
use parsegen::queue::work_queue::JobQueue;
use parsegen::workers::{CrawlBackoff, CrawlWorker, SynthesisBackoff, SynthesisWorker};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BASELINE: &str = r#"
openai_model: gpt-5-mini
instructions_prompt: "Write a parser config."
input_prompt_template: "{html_content}"
"#;

/// 按预设页面返回内容的抓取器
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, String>>,
}

impl StaticFetcher {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: Mutex::new(
                pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .lock()
            .get(url)
            .cloned()
            .ok_or(FetchError::HttpStatus(404))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// 返回固定参数的推理服务，同时记录调用时前缀的存储状态
pub struct RecordingProvider {
    parameters: ParserParameters,
    repo: CrawlRepository,
    pub observed: Mutex<Vec<String>>,
}

#[async_trait]
impl InferenceProvider for RecordingProvider {
    async fn generate(&self, _request: &InferenceRequest) -> Result<ParserParameters, InferenceError> {
        let prefixes = self
            .repo
            .scan::<parsegen::domain::models::url_prefix::UrlPrefix>()
            .await
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?;
        self.observed.lock().extend(
            prefixes
                .iter()
                .map(|prefix| prefix.processing_status.to_string()),
        );
        Ok(self.parameters.clone())
    }
}

/// 内存后端上的完整流水线
pub struct Pipeline {
    pub repo: CrawlRepository,
    pub queue: JobQueue,
    pub provider: Arc<RecordingProvider>,
    pub crawl_worker: CrawlWorker,
    pub synthesis_worker: SynthesisWorker,
    _configs: TempDir,
}

pub fn quick_crawl_backoff() -> CrawlBackoff {
    CrawlBackoff {
        idle: Duration::from_millis(10),
        paused: Duration::from_millis(10),
        item: Duration::ZERO,
        deferred: Duration::ZERO,
    }
}

pub fn quick_synthesis_backoff() -> SynthesisBackoff {
    SynthesisBackoff {
        idle: Duration::from_millis(10),
        paused: Duration::from_millis(10),
        job: Duration::ZERO,
    }
}

impl Pipeline {
    /// 构建流水线；`requeue_delay_secs` 为 0 时重新入队的 URL 立即可处理
    pub async fn new(pages: &[(&str, &str)], parameters: ParserParameters, requeue_delay_secs: i64) -> Self {
        let configs = tempfile::tempdir().unwrap();
        std::fs::write(configs.path().join("baseline.yaml"), BASELINE).unwrap();

        let repo = CrawlRepository::new(Arc::new(InMemoryStore::new()));
        let queue = JobQueue::new(Arc::new(InMemoryQueue::new()));
        repo.set_production_config("baseline").await.unwrap();

        let provider = Arc::new(RecordingProvider {
            parameters,
            repo: repo.clone(),
            observed: Mutex::new(Vec::new()),
        });

        let frontier = FrontierService::new(
            repo.clone(),
            queue.clone(),
            Arc::new(StaticFetcher::new(pages)),
            FrontierPolicy {
                prefix_url_cap: 20,
                requeue_delay_secs,
            },
        );
        let crawl_worker = CrawlWorker::new(frontier, repo.clone(), queue.clone(), quick_crawl_backoff());

        let synthesis = SynthesisService::new(
            repo.clone(),
            provider.clone(),
            SynthesisConfigLoader::new(configs.path()),
        );
        let synthesis_worker =
            SynthesisWorker::new(synthesis, repo.clone(), queue.clone(), quick_synthesis_backoff());

        Self {
            repo,
            queue,
            provider,
            crawl_worker,
            synthesis_worker,
            _configs: configs,
        }
    }
}

pub fn main_only() -> ParserParameters {
    ParserParameters::new(vec!["main"], vec![], vec!["nav"], vec![])
}
