// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

use crate::domain::models::price_range::PriceRange;
use crate::domain::models::query::SearchQuery;
use crate::engines::traits::{BrowserSession, SessionFactory};
use crate::utils::errors::ProbeError;
use crate::utils::text_processing::{has_digits, parse_count};

/// 结果数量统计接口
///
/// 区间发现器只依赖此接口，便于脱离浏览器测试。
#[async_trait]
pub trait ResultCounter: Send + Sync {
    /// 返回站点对该价格区间报告的结果总数
    async fn count(&self, range: &PriceRange) -> Result<u64, ProbeError>;
}

/// 探测选项
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// 结果数量指示器选择器
    pub count_selector: String,
    /// "无结果" 指示器选择器
    pub no_results_selector: Option<String>,
    /// 等待指示器渲染的超时
    pub timeout: Duration,
    /// 轮询间隔
    pub poll_interval: Duration,
}

/// 结果数量探测器
///
/// 加载查询首页，等待结果数量指示器渲染出数字后解析。
pub struct CountProbe {
    factory: Arc<dyn SessionFactory>,
    options: ProbeOptions,
}

impl CountProbe {
    pub fn new(factory: Arc<dyn SessionFactory>, options: ProbeOptions) -> Self {
        Self { factory, options }
    }

    /// 探测URL对应查询的结果总数
    ///
    /// # 返回值
    ///
    /// * `Ok(0)` - "无结果" 指示器可见
    /// * `Ok(n)` - 指示器文本中的数字
    /// * `Err(ProbeError::Timeout)` - 指示器在超时内未渲染
    /// * `Err(ProbeError::Parse)` - 指示器已渲染但文本不含数字
    #[instrument(skip(self, url), fields(url = %url))]
    pub async fn probe(&self, url: &str) -> Result<u64, ProbeError> {
        let mut session = self.factory.open().await?;
        let result = self.probe_with(session.as_mut(), url).await;
        if let Err(e) = session.close().await {
            debug!("Failed to close probe session: {}", e);
        }
        result
    }

    /// 使用已有会话探测
    pub async fn probe_with(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<u64, ProbeError> {
        session.goto(url).await?;

        let deadline = Instant::now() + self.options.timeout;
        let mut last_text: Option<String> = None;

        loop {
            if let Some(no_results) = &self.options.no_results_selector {
                if !session.visible_texts(no_results).await?.is_empty() {
                    debug!("No-results indicator visible");
                    return Ok(0);
                }
            }

            for text in session.visible_texts(&self.options.count_selector).await? {
                if has_digits(&text) {
                    if let Some(count) = parse_count(&text) {
                        debug!(count, "Parsed result count");
                        return Ok(count);
                    }
                }
                if !text.is_empty() {
                    last_text = Some(text);
                }
            }

            if Instant::now() >= deadline {
                break;
            }
            sleep(self.options.poll_interval).await;
        }

        match last_text {
            Some(text) => {
                warn!(text = %text, "Result count indicator rendered without digits");
                Err(ProbeError::Parse {
                    url: url.to_string(),
                    text,
                })
            }
            None => {
                warn!("Result count indicator never rendered");
                Err(ProbeError::Timeout {
                    url: url.to_string(),
                })
            }
        }
    }
}

/// 绑定到某个查询的探测器
pub struct QueryCounter {
    probe: Arc<CountProbe>,
    query: SearchQuery,
}

impl QueryCounter {
    pub fn new(probe: Arc<CountProbe>, query: SearchQuery) -> Self {
        Self { probe, query }
    }
}

#[async_trait]
impl ResultCounter for QueryCounter {
    async fn count(&self, range: &PriceRange) -> Result<u64, ProbeError> {
        self.probe.probe(self.query.range_url(range).as_str()).await
    }
}
