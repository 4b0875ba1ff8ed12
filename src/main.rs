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

use clap::Parser;
use parsegen::config::settings::Settings;
use parsegen::presentation::cli::{self, Cli};
use parsegen::utils::telemetry;
use tracing::info;

/// 主函数
///
/// 初始化日志和配置，然后执行命令
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    telemetry::init_telemetry(cli.json_logs);

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    cli::run(cli, settings).await
}
