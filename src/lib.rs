// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含价格区间、条目等核心实体，以及区间发现、聚合与编排服务
pub mod domain;

/// 引擎模块
///
/// 浏览器会话抽象与基于浏览器的探测、抓取、提取实现
pub mod engines;

/// 基础设施模块
///
/// 提供外部服务集成，如结果上传
pub mod infrastructure;

/// 队列模块
///
/// 实现页面任务队列
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现区间内的并发页面抓取
pub mod workers;
