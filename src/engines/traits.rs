// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// 导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 浏览器或会话错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 页面脚本执行失败
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Navigation(_) | EngineError::Timeout => true,
            EngineError::Evaluation(_) => true,
            // A dead browser will not come back within one page's retry budget
            EngineError::Browser(_) => false,
        }
    }
}

/// 浏览器会话（一个标签页）
///
/// 会话不在工作者之间共享；所有挂起点都是网络相关的导航和DOM查询。
#[async_trait]
pub trait BrowserSession: Send {
    /// 导航到指定URL并等待加载
    async fn goto(&mut self, url: &str) -> Result<(), EngineError>;

    /// 原地重新加载当前页面
    async fn reload(&mut self) -> Result<(), EngineError>;

    /// 当前已提交的页面URL；尚未导航时为None
    async fn current_url(&mut self) -> Result<Option<String>, EngineError>;

    /// 统计匹配选择器的元素数量
    async fn count(&mut self, selector: &str) -> Result<usize, EngineError>;

    /// 返回匹配选择器且可见的元素文本
    async fn visible_texts(&mut self, selector: &str) -> Result<Vec<String>, EngineError>;

    /// 点击第一个匹配元素；不存在时返回false
    async fn click(&mut self, selector: &str) -> Result<bool, EngineError>;

    /// 当前DOM的HTML序列化
    async fn content(&mut self) -> Result<String, EngineError>;

    /// 关闭会话
    async fn close(self: Box<Self>) -> Result<(), EngineError>;
}

/// 会话工厂
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// 打开一个新的浏览器会话
    async fn open(&self) -> Result<Box<dyn BrowserSession>, EngineError>;
}
