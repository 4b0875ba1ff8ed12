// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 命令行操作界面
pub mod cli;
pub mod commands;
