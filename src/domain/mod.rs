// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含爬取的核心逻辑，包括：
/// - 领域模型（models）：价格区间、查询、条目与爬取结果
/// - 服务（services）：区间发现、结果聚合与爬取编排
///
/// 领域层只依赖浏览器会话抽象，不依赖具体浏览器实现。
pub mod models;
pub mod services;
