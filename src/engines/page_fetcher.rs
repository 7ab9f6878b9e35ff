// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::domain::models::listing::RawListing;
use crate::domain::models::price_range::PriceRange;
use crate::domain::models::query::SearchQuery;
use crate::engines::listing_extractor::ListingExtractor;
use crate::engines::traits::{BrowserSession, EngineError};
use crate::utils::errors::FetchError;
use crate::utils::retry_policy::RetryPolicy;

/// 页面抓取选项
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// 条目容器选择器
    pub container_selector: String,
    /// 提取前点击的元素
    pub pre_extract_click: Option<String>,
    /// 等待容器出现的超时
    pub container_timeout: Duration,
    /// 等待条目数量稳定的超时
    pub stabilize_timeout: Duration,
    /// 轮询间隔
    pub poll_interval: Duration,
    /// 判定稳定所需的连续相同采样数
    pub stable_samples: usize,
    /// 重试策略
    pub retry: RetryPolicy,
}

/// 单次尝试失败原因
#[derive(Debug)]
enum AttemptError {
    Engine(EngineError),
    ContainerTimeout,
    Unstable { last_samples: Vec<usize> },
    /// 重新加载后停留在其他页面
    WrongPage { landed: Option<String> },
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Engine(e) => write!(f, "{}", e),
            AttemptError::ContainerTimeout => write!(f, "listing container did not appear"),
            AttemptError::Unstable { last_samples } => {
                write!(f, "listing count did not stabilise (samples {:?})", last_samples)
            }
            AttemptError::WrongPage { landed } => write!(
                f,
                "reload landed on {} instead of the requested page",
                landed.as_deref().unwrap_or("no page")
            ),
        }
    }
}

impl From<EngineError> for AttemptError {
    fn from(e: EngineError) -> Self {
        AttemptError::Engine(e)
    }
}

/// 页面抓取器
///
/// 加载某个区间的一页结果，等待渲染稳定后交给提取器解析。失败时按重试策略
/// 再尝试；全部尝试失败时返回 [`FetchError`]，由调用方记录并跳过该页。
pub struct PageFetcher {
    query: SearchQuery,
    extractor: Arc<dyn ListingExtractor>,
    options: FetchOptions,
}

impl PageFetcher {
    pub fn new(
        query: SearchQuery,
        extractor: Arc<dyn ListingExtractor>,
        options: FetchOptions,
    ) -> Self {
        Self {
            query,
            extractor,
            options,
        }
    }

    /// 抓取一页
    ///
    /// # 参数
    ///
    /// * `session` - 工作者独占的浏览器会话
    /// * `range` - 价格区间
    /// * `page` - 页码（从1开始）
    #[instrument(skip(self, session, range), fields(range = %range))]
    pub async fn fetch(
        &self,
        session: &mut dyn BrowserSession,
        range: &PriceRange,
        page: u32,
    ) -> Result<Vec<RawListing>, FetchError> {
        let url = self.query.page_url(range, page);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.attempt(session, &url).await {
                Ok(listings) => {
                    info!(attempts, listings = listings.len(), "Page fetched");
                    return Ok(listings);
                }
                Err(e) if self.options.retry.should_retry(attempts) => {
                    let backoff = self.options.retry.calculate_backoff(attempts);
                    warn!(attempts, error = %e, ?backoff, "Page attempt failed, retrying");
                    sleep(backoff).await;
                }
                Err(e) => {
                    warn!(attempts, error = %e, "Page attempt failed, giving up");
                    return Err(FetchError {
                        page,
                        attempts,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn attempt(
        &self,
        session: &mut dyn BrowserSession,
        url: &Url,
    ) -> Result<Vec<RawListing>, AttemptError> {
        if let Err(e) = session.goto(url.as_str()).await {
            debug!(error = %e, "Navigation failed, reloading in place");
            session.reload().await?;
            // A goto that failed before committing leaves the previous page loaded
            let landed = session.current_url().await?;
            if !is_same_page(landed.as_deref(), url) {
                return Err(AttemptError::WrongPage { landed });
            }
        }

        self.wait_for_container(session).await?;
        self.wait_for_stable_count(session).await?;

        if let Some(selector) = &self.options.pre_extract_click {
            if session.click(selector).await? {
                // Give the toggle a poll interval to re-render prices
                sleep(self.options.poll_interval).await;
            }
        }

        let html = session.content().await?;
        Ok(self.extractor.extract(&html, url))
    }

    async fn wait_for_container(&self, session: &mut dyn BrowserSession) -> Result<(), AttemptError> {
        let deadline = Instant::now() + self.options.container_timeout;
        loop {
            if session.count(&self.options.container_selector).await? > 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AttemptError::ContainerTimeout);
            }
            sleep(self.options.poll_interval).await;
        }
    }

    /// 等待条目数量在连续 `stable_samples` 次采样中保持不变
    ///
    /// 采样历史是本次调用的局部状态，不挂在浏览器会话上。
    async fn wait_for_stable_count(
        &self,
        session: &mut dyn BrowserSession,
    ) -> Result<usize, AttemptError> {
        let needed = self.options.stable_samples.max(1);
        let deadline = Instant::now() + self.options.stabilize_timeout;
        let mut samples: Vec<usize> = Vec::with_capacity(needed);

        loop {
            let current = session.count(&self.options.container_selector).await?;
            samples.push(current);
            if samples.len() > needed {
                samples.remove(0);
            }

            if is_stable(&samples, needed) {
                debug!(count = current, "Listing count stable");
                return Ok(current);
            }
            if Instant::now() >= deadline {
                return Err(AttemptError::Unstable {
                    last_samples: samples,
                });
            }
            sleep(self.options.poll_interval).await;
        }
    }
}

fn is_stable(samples: &[usize], needed: usize) -> bool {
    samples.len() >= needed && samples.iter().all(|&n| n == samples[0])
}

fn is_same_page(landed: Option<&str>, target: &Url) -> bool {
    landed
        .and_then(|u| Url::parse(u).ok())
        .map_or(false, |u| u == *target)
}
