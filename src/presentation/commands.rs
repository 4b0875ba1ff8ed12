// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{bail, Context};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::settings::Settings;
use crate::domain::models::run_state::RunState;
use crate::domain::models::synthesis_config::SynthesisConfigLoader;
use crate::domain::models::url_prefix::{ProcessingStatus, SampleUrl, UrlPrefix};
use crate::domain::models::url_record::{UrlQueueItem, UrlRecord};
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::domain::repositories::object_store::ObjectStore;
use crate::domain::services::crawl_service::FrontierService;
use crate::domain::services::llm_service::OpenAiProvider;
use crate::domain::services::synthesis_service::SynthesisService;
use crate::engines::reqwest_engine::ReqwestFetcher;
use crate::engines::traits::PageFetcher;
use crate::infrastructure::redis_client::RedisClient;
use crate::queue::work_queue::{JobQueue, WorkQueue};
use crate::workers::{CrawlBackoff, CrawlWorker, SynthesisBackoff, SynthesisWorker, WorkerManager};

/// 命令共享的依赖
pub struct AppContext {
    pub settings: Settings,
    pub repo: CrawlRepository,
    pub queue: JobQueue,
}

impl AppContext {
    /// 连接 Redis，存储和队列共用一个客户端
    pub fn connect(settings: Settings) -> anyhow::Result<Self> {
        let redis = Arc::new(
            RedisClient::new(&settings.redis.url)
                .with_context(|| format!("invalid redis url {}", settings.redis.url))?,
        );
        let store: Arc<dyn ObjectStore> = redis.clone();
        let queue: Arc<dyn WorkQueue> = redis;
        Ok(Self::with_backends(settings, store, queue))
    }

    pub fn with_backends(
        settings: Settings,
        store: Arc<dyn ObjectStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            settings,
            repo: CrawlRepository::new(store),
            queue: JobQueue::new(queue),
        }
    }

    pub fn config_loader(&self) -> SynthesisConfigLoader {
        SynthesisConfigLoader::new(self.settings.synthesis.configs_dir.clone())
    }

    fn fetcher(&self) -> anyhow::Result<ReqwestFetcher> {
        ReqwestFetcher::new(
            &self.settings.crawler.user_agent,
            self.settings.crawler.fetch_timeout(),
        )
        .context("failed to build HTTP client")
    }

    pub fn crawl_worker(&self) -> anyhow::Result<CrawlWorker> {
        let service = FrontierService::new(
            self.repo.clone(),
            self.queue.clone(),
            Arc::new(self.fetcher()?),
            self.settings.crawler.frontier_policy(),
        );
        Ok(CrawlWorker::new(
            service,
            self.repo.clone(),
            self.queue.clone(),
            CrawlBackoff::from(&self.settings.crawler),
        ))
    }

    pub fn synthesis_service(&self) -> anyhow::Result<SynthesisService> {
        let llm = &self.settings.llm;
        let provider = OpenAiProvider::new(llm.api_key.clone(), llm.api_base_url.clone(), llm.timeout())
            .context("failed to build inference client")?;
        Ok(SynthesisService::new(
            self.repo.clone(),
            Arc::new(provider),
            self.config_loader(),
        ))
    }

    pub fn synthesis_worker(&self) -> anyhow::Result<SynthesisWorker> {
        Ok(SynthesisWorker::new(
            self.synthesis_service()?,
            self.repo.clone(),
            self.queue.clone(),
            SynthesisBackoff::from(&self.settings.synthesis),
        ))
    }
}

/// 启动工作器并等待 Ctrl-C
pub async fn cmd_run_workers(ctx: &AppContext, crawl: bool, synthesis: bool) -> anyhow::Result<()> {
    let mut manager = WorkerManager::new();

    if synthesis {
        let service = ctx.synthesis_service()?;
        match service.ensure_production_config().await? {
            Some(name) => info!("Production config: {}", name),
            None => warn!("No production config available, synthesis jobs will fail until one is set"),
        }
        manager.spawn(Arc::new(ctx.synthesis_worker()?));
    }
    if crawl {
        manager.spawn(Arc::new(ctx.crawl_worker()?));
    }

    manager.wait_for_shutdown().await;
    Ok(())
}

/// 把 URL 加入抓取队列
pub async fn cmd_enqueue_url(ctx: &AppContext, url: &str, delay_secs: i64) -> anyhow::Result<()> {
    let url = url.trim();
    if url.is_empty() {
        bail!("URL must not be empty");
    }
    let item = UrlQueueItem::new(UrlRecord::new(url), Utc::now().timestamp() + delay_secs);
    ctx.queue.push(&item).await?;
    println!(
        "Queued {} (process from {})",
        item.url.url, item.process_from_unix_timestamp
    );
    Ok(())
}

/// 抓取样本页面并把前缀加入生成队列
pub async fn cmd_enqueue_prefix(
    ctx: &AppContext,
    prefix: &str,
    sample_urls: &[String],
    force: bool,
) -> anyhow::Result<()> {
    let fetcher = ctx.fetcher()?;
    let pages = join_all(sample_urls.iter().map(|url| fetcher.fetch(url))).await;

    let mut url_prefix = UrlPrefix::new(prefix);
    for (url, page) in sample_urls.iter().zip(pages) {
        let raw = page.with_context(|| format!("failed to load sample {}", url))?;
        url_prefix.add_sample(SampleUrl::new(url.clone(), raw));
    }
    if force {
        reset_prefix(ctx, &url_prefix).await?;
    }
    enqueue_prefix(ctx, url_prefix).await
}

/// 合并样本并把已有前缀重置为 none，使生成任务重新认领
///
/// 正在生成的前缀不能重置
pub(crate) async fn reset_prefix(ctx: &AppContext, url_prefix: &UrlPrefix) -> anyhow::Result<()> {
    let reset = ctx
        .repo
        .update_prefix(&url_prefix.prefix, |stored| {
            let mut prefix = stored?;
            if prefix.processing_status == ProcessingStatus::InProgress {
                return None;
            }
            for sample in &url_prefix.sample_urls {
                prefix.add_sample(sample.clone());
            }
            prefix.processing_status = ProcessingStatus::None;
            Some(prefix)
        })
        .await?;

    match reset {
        Some(_) => info!("Reset URLPrefix {} for regeneration", url_prefix.prefix),
        None => {
            let stored = ctx.repo.load_prefix(&url_prefix.prefix).await?;
            if stored.is_some() {
                bail!(
                    "prefix {} is being processed, retry once generation finishes",
                    url_prefix.prefix
                );
            }
        }
    }
    Ok(())
}

pub(crate) async fn enqueue_prefix(ctx: &AppContext, url_prefix: UrlPrefix) -> anyhow::Result<()> {
    ctx.queue.push(&url_prefix).await?;
    println!(
        "Queued prefix {} with {} samples",
        url_prefix.prefix,
        url_prefix.sample_urls.len()
    );
    Ok(())
}

pub async fn cmd_state_get(ctx: &AppContext) -> anyhow::Result<()> {
    println!("{}", ctx.repo.run_state().await?);
    Ok(())
}

pub async fn cmd_state_set(ctx: &AppContext, paused: bool) -> anyhow::Result<()> {
    let state = if paused {
        RunState::Paused
    } else {
        RunState::Running
    };
    ctx.repo.set_run_state(state).await?;
    println!("{}", state);
    Ok(())
}

/// 显示或设置生产配置，设置前确认配置可以加载
pub async fn cmd_production_config(ctx: &AppContext, name: Option<&str>) -> anyhow::Result<()> {
    match name {
        Some(name) => {
            ctx.config_loader()
                .load(name)
                .with_context(|| format!("config {} cannot be used", name))?;
            ctx.repo.set_production_config(name).await?;
            println!("Production config set to {}", name);
        }
        None => match ctx.repo.production_config().await? {
            Some(name) => println!("{}", name),
            None => println!("(not set)"),
        },
    }
    Ok(())
}

pub async fn cmd_list_configs(ctx: &AppContext) -> anyhow::Result<()> {
    let production = ctx.repo.production_config().await?;
    for name in ctx.config_loader().list()? {
        let marker = if production.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, name);
    }
    Ok(())
}

pub async fn cmd_queues(ctx: &AppContext, clear: bool) -> anyhow::Result<()> {
    println!("urls:     {}", ctx.queue.len::<UrlQueueItem>().await?);
    println!("prefixes: {}", ctx.queue.len::<UrlPrefix>().await?);
    if clear {
        ctx.queue.clear::<UrlQueueItem>().await?;
        ctx.queue.clear::<UrlPrefix>().await?;
        warn!("Cleared url and prefix queues");
    }
    Ok(())
}

pub async fn cmd_delete_prefix(ctx: &AppContext, prefix: &str) -> anyhow::Result<()> {
    if ctx.repo.load_prefix(prefix).await?.is_none() {
        bail!("URLPrefix {} not found", prefix);
    }
    let deleted = ctx.repo.delete_prefix(prefix).await?;
    println!("Deleted {} and {} associated URLs", prefix, deleted);
    Ok(())
}
