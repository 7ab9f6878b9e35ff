// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::models::crawl_result::{CrawlResult, RangeSummary, SkippedRange, DEADLINE_REASON};
use crate::domain::models::price_range::PriceRange;
use crate::domain::models::query::SearchQuery;
use crate::domain::services::grouping::GroupingStrategy;
use crate::domain::services::range_discoverer::RangeDiscoverer;
use crate::domain::services::result_aggregator::ResultAggregator;
use crate::engines::count_probe::{CountProbe, ProbeOptions, QueryCounter, ResultCounter};
use crate::engines::listing_extractor::ListingExtractor;
use crate::engines::page_fetcher::{FetchOptions, PageFetcher};
use crate::engines::traits::SessionFactory;
use crate::utils::errors::CrawlError;
use crate::workers::page_worker_pool::WorkerPool;

/// 爬取请求
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// 基础查询
    pub query: SearchQuery,
    /// 完整价格域
    pub domain: PriceRange,
    /// 初始划分（为空时使用整个价格域）
    pub seeds: Vec<PriceRange>,
    /// 单次查询可分页访问的最大结果数
    pub cap: u64,
    /// 每个区间的并发工作者数
    pub concurrency: usize,
    /// 每页结果数
    pub page_size: u32,
    /// 可选的整体截止时间
    pub deadline: Option<Duration>,
}

/// 计算页数：`ceil(count / page_size)`
pub fn total_pages(count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(count.div_ceil(page_size)).unwrap_or(u32::MAX)
}

/// 爬取编排器
///
/// 依次执行：区间发现 → 对每个区间重新探测数量并用工作者池抓取全部页面 → 聚合。
/// 区间按顺序逐个处理，并发只存在于区间内部的页面之间，
/// 因此同时打开的浏览器会话数不超过 `concurrency`。
pub struct CrawlOrchestrator {
    factory: Arc<dyn SessionFactory>,
    extractor: Arc<dyn ListingExtractor>,
    probe_options: ProbeOptions,
    fetch_options: FetchOptions,
}

impl CrawlOrchestrator {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        extractor: Arc<dyn ListingExtractor>,
        probe_options: ProbeOptions,
        fetch_options: FetchOptions,
    ) -> Self {
        Self {
            factory,
            extractor,
            probe_options,
            fetch_options,
        }
    }

    /// 执行一次完整爬取
    ///
    /// 单页或单个区间的失败不会导致错误，只会出现在结果的跳过记录中。
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlResult)` - 聚合结果（可能不完整，见 [`CrawlResult::is_complete`]）
    /// * `Err(CrawlError::InvalidSeeds)` - 种子区间不合法
    /// * `Err(CrawlError::NoValidRanges)` - 价格域完全无法探测
    pub async fn crawl(
        &self,
        request: &CrawlRequest,
        strategy: &dyn GroupingStrategy,
    ) -> Result<CrawlResult, CrawlError> {
        let crawl_id = Uuid::new_v4();
        let span = info_span!("crawl", crawl_id = %crawl_id, base_url = %request.query.base_url);
        self.run(crawl_id, request, strategy).instrument(span).await
    }

    async fn run(
        &self,
        crawl_id: Uuid,
        request: &CrawlRequest,
        strategy: &dyn GroupingStrategy,
    ) -> Result<CrawlResult, CrawlError> {
        let started_at = Utc::now();
        let deadline = request.deadline.map(|d| Instant::now() + d);

        let probe = Arc::new(CountProbe::new(
            self.factory.clone(),
            self.probe_options.clone(),
        ));
        let counter = QueryCounter::new(probe, request.query.clone());

        let discovery = RangeDiscoverer::new(&counter)
            .with_deadline(deadline)
            .discover(request.domain, request.cap, &request.seeds)
            .await?;

        if discovery.ranges.is_empty() && !discovery.skipped.is_empty() && !discovery.hit_deadline {
            return Err(CrawlError::NoValidRanges {
                failures: discovery.skipped,
            });
        }

        let fetcher = Arc::new(PageFetcher::new(
            request.query.clone(),
            self.extractor.clone(),
            self.fetch_options.clone(),
        ));
        let pool = WorkerPool::new(self.factory.clone(), fetcher);
        let aggregator = ResultAggregator::new();

        let mut listings = Vec::new();
        let mut summaries = Vec::new();
        let mut skipped_pages = Vec::new();
        let mut skipped_ranges = discovery.skipped;

        for discovered in discovery.ranges {
            let range = discovered.range;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(range = %range, "Crawl deadline reached, range not fetched");
                skipped_ranges.push(SkippedRange {
                    range,
                    reason: DEADLINE_REASON.to_string(),
                });
                continue;
            }

            // Counts can drift between discovery and fetch, so page count comes from a fresh probe
            let reprobe = counter.count(&range);
            let reprobed = match deadline {
                Some(d) => match timeout_at(d, reprobe).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(range = %range, "Crawl deadline reached during re-probe");
                        skipped_ranges.push(SkippedRange {
                            range,
                            reason: DEADLINE_REASON.to_string(),
                        });
                        continue;
                    }
                },
                None => reprobe.await,
            };
            let count = match reprobed {
                Ok(count) => count,
                Err(e) => {
                    warn!(range = %range, error = %e, "Re-probe failed, skipping range");
                    skipped_ranges.push(SkippedRange {
                        range,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // Results past the cap cannot be paged to, so only the reachable pages are queued
            let capped = discovered.capped || count > request.cap;
            let pages = total_pages(count.min(request.cap), request.page_size);
            info!(range = %range, count, pages, capped, "Fetching range");

            let outcome = pool
                .run(range, pages, request.concurrency, deadline)
                .await;
            let fetched_pages = outcome.pages.len() as u32;
            skipped_pages.extend(outcome.skipped.iter().cloned());

            let range_listings = outcome.into_listings();
            summaries.push(RangeSummary {
                range,
                count,
                total_pages: pages,
                fetched_pages,
                listings: range_listings.len(),
                capped,
            });

            aggregator.add_all(range_listings.clone(), strategy);
            listings.extend(range_listings);
        }

        let variants = aggregator.finish();
        let result = CrawlResult {
            crawl_id,
            listings,
            variants,
            ranges: summaries,
            skipped_pages,
            skipped_ranges,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            listings = result.listings.len(),
            variants = result.variants.len(),
            ranges = result.ranges.len(),
            skipped_pages = result.skipped_pages.len(),
            skipped_ranges = result.skipped_ranges.len(),
            complete = result.is_complete(),
            "Crawl finished"
        );
        Ok(result)
    }
}
