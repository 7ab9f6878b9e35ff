// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 浏览器与页面交互模块
///
/// - traits：浏览器会话抽象
/// - chromium_engine：基于 chromiumoxide 的会话实现
/// - count_probe：结果数量探测
/// - page_fetcher：单页抓取（重试、重载、数量稳定）
/// - listing_extractor：从页面HTML提取条目
pub mod chromium_engine;
pub mod count_probe;
pub mod listing_extractor;
pub mod page_fetcher;
pub mod traits;
