// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 抓取和解析器生成两个轮询循环，以及它们的生命周期管理
pub mod crawl_worker;
pub mod manager;
pub mod synthesis_worker;
pub mod worker;

pub use crawl_worker::{CrawlBackoff, CrawlWorker};
pub use manager::WorkerManager;
pub use synthesis_worker::{SynthesisBackoff, SynthesisWorker};
pub use worker::Worker;
