// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};

use crate::config::settings::Settings;
use crate::presentation::commands::{self, AppContext};

/// 命令行入口
#[derive(Debug, Parser)]
#[command(name = "parsegen")]
#[command(about = "Prefix-scoped crawler with LLM-generated extraction parsers")]
#[command(version)]
pub struct Cli {
    /// Emit JSON log lines
    #[arg(long, global = true, env = "PARSEGEN_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the crawl worker loop
    CrawlWorker,

    /// Run the parser generation worker loop
    SynthesisWorker,

    /// Run both worker loops in one process
    Run,

    /// Add a URL to the crawl queue
    EnqueueUrl {
        /// Page URL
        url: String,
        /// Delay before the URL may be processed, in seconds
        #[arg(long, default_value = "0")]
        delay_secs: i64,
    },

    /// Fetch sample pages and queue a prefix for parser generation
    EnqueuePrefix {
        /// URL prefix
        prefix: String,
        /// Sample page URLs
        #[arg(required = true)]
        sample_urls: Vec<String>,
        /// Regenerate the parser even if the prefix already has one
        #[arg(long)]
        force: bool,
    },

    /// Show or change the system run state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },

    /// Show or set the production synthesis config
    ProductionConfig {
        /// Config name to make production
        name: Option<String>,
    },

    /// List available synthesis configs
    Configs,

    /// Show queue lengths
    Queues {
        /// Empty both queues after printing their lengths
        #[arg(long)]
        clear: bool,
    },

    /// Delete a prefix and all of its page records
    DeletePrefix {
        /// URL prefix
        prefix: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum StateCommands {
    /// Print the current run state
    Get,
    /// Pause both workers
    Pause,
    /// Resume both workers
    Resume,
}

/// 执行命令
pub async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    let ctx = AppContext::connect(settings)?;

    match cli.command {
        Commands::CrawlWorker => commands::cmd_run_workers(&ctx, true, false).await,
        Commands::SynthesisWorker => commands::cmd_run_workers(&ctx, false, true).await,
        Commands::Run => commands::cmd_run_workers(&ctx, true, true).await,
        Commands::EnqueueUrl { url, delay_secs } => {
            commands::cmd_enqueue_url(&ctx, &url, delay_secs).await
        }
        Commands::EnqueuePrefix {
            prefix,
            sample_urls,
            force,
        } => commands::cmd_enqueue_prefix(&ctx, &prefix, &sample_urls, force).await,
        Commands::State { command } => match command {
            StateCommands::Get => commands::cmd_state_get(&ctx).await,
            StateCommands::Pause => commands::cmd_state_set(&ctx, true).await,
            StateCommands::Resume => commands::cmd_state_set(&ctx, false).await,
        },
        Commands::ProductionConfig { name } => {
            commands::cmd_production_config(&ctx, name.as_deref()).await
        }
        Commands::Configs => commands::cmd_list_configs(&ctx).await,
        Commands::Queues { clear } => commands::cmd_queues(&ctx, clear).await,
        Commands::DeletePrefix { prefix } => commands::cmd_delete_prefix(&ctx, &prefix).await,
    }
}
