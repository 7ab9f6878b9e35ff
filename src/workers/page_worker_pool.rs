// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::join_all;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::crawl_result::{SkippedPage, DEADLINE_REASON};
use crate::domain::models::listing::RawListing;
use crate::domain::models::price_range::PriceRange;
use crate::engines::page_fetcher::PageFetcher;
use crate::engines::traits::SessionFactory;
use crate::queue::page_queue::PageQueue;

/// 成功抓取的页面
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub page: u32,
    pub listings: Vec<RawListing>,
}

/// 单个区间的抓取结果
#[derive(Debug, Clone, Default)]
pub struct PoolOutcome {
    /// 按页码升序排列
    pub pages: Vec<FetchedPage>,
    /// 按页码升序排列
    pub skipped: Vec<SkippedPage>,
}

impl PoolOutcome {
    /// 按页码顺序展开所有条目
    pub fn into_listings(self) -> Vec<RawListing> {
        self.pages.into_iter().flat_map(|p| p.listings).collect()
    }
}

/// 单个工作者的运行报告
#[derive(Default)]
struct WorkerReport {
    pages: Vec<FetchedPage>,
    skipped: Vec<SkippedPage>,
    session_error: Option<String>,
    hit_deadline: bool,
}

/// 工作者池
///
/// 针对一个价格区间启动 `concurrency` 个工作者，共享一个页码队列。
/// 每个工作者在区间内独占一个浏览器会话，循环出队并抓取直到队列耗尽。
pub struct WorkerPool {
    factory: Arc<dyn SessionFactory>,
    fetcher: Arc<PageFetcher>,
}

impl WorkerPool {
    pub fn new(factory: Arc<dyn SessionFactory>, fetcher: Arc<PageFetcher>) -> Self {
        Self { factory, fetcher }
    }

    /// 抓取区间内的全部页面
    ///
    /// # 参数
    ///
    /// * `range` - 价格区间
    /// * `total_pages` - 页数
    /// * `concurrency` - 工作者数量（限制在 `1..=total_pages`）
    /// * `deadline` - 可选的爬取截止时间，到期后剩余页面记为跳过
    ///
    /// # 返回值
    ///
    /// 所有成功页面的并集及跳过记录；单页失败不会中断其他工作者
    #[instrument(skip(self, range, deadline), fields(range = %range))]
    pub async fn run(
        &self,
        range: PriceRange,
        total_pages: u32,
        concurrency: usize,
        deadline: Option<Instant>,
    ) -> PoolOutcome {
        if total_pages == 0 {
            return PoolOutcome::default();
        }

        let queue = PageQueue::with_pages(total_pages);
        let workers = concurrency.clamp(1, total_pages as usize);
        info!(total_pages, workers, "Starting worker pool");

        let reports = join_all(
            (0..workers).map(|worker_id| self.worker_loop(worker_id, &queue, range, deadline)),
        )
        .await;

        let mut outcome = PoolOutcome::default();
        let mut session_error = None;
        let mut hit_deadline = false;
        for report in reports {
            outcome.pages.extend(report.pages);
            outcome.skipped.extend(report.skipped);
            hit_deadline |= report.hit_deadline;
            if session_error.is_none() {
                session_error = report.session_error;
            }
        }

        // Pages nobody claimed: every session failed to open, or the deadline passed
        let leftover = queue.drain();
        if !leftover.is_empty() {
            let reason = if hit_deadline {
                DEADLINE_REASON.to_string()
            } else {
                format!(
                    "no browser session available: {}",
                    session_error.as_deref().unwrap_or("unknown error")
                )
            };
            warn!(pages = leftover.len(), reason = %reason, "Pages left unfetched");
            outcome
                .skipped
                .extend(leftover.into_iter().map(|task| SkippedPage {
                    range,
                    page: task.page,
                    attempts: 0,
                    reason: reason.clone(),
                }));
        }

        outcome.pages.sort_by_key(|p| p.page);
        outcome.skipped.sort_by_key(|s| s.page);

        info!(
            fetched = outcome.pages.len(),
            skipped = outcome.skipped.len(),
            "Worker pool finished"
        );
        outcome
    }

    async fn worker_loop(
        &self,
        worker_id: usize,
        queue: &PageQueue,
        range: PriceRange,
        deadline: Option<Instant>,
    ) -> WorkerReport {
        let mut report = WorkerReport::default();

        let mut session = match self.factory.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!(worker_id, error = %e, "Worker could not open a browser session");
                report.session_error = Some(e.to_string());
                return report;
            }
        };
        debug!(worker_id, "Worker started");

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                report.hit_deadline = true;
                break;
            }

            let Some(task) = queue.dequeue() else {
                break;
            };

            let fetch = self.fetcher.fetch(session.as_mut(), &range, task.page);
            let result = match deadline {
                Some(d) => match tokio::time::timeout_at(d, fetch).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(worker_id, page = task.page, "Deadline reached mid-fetch");
                        report.hit_deadline = true;
                        report.skipped.push(SkippedPage {
                            range,
                            page: task.page,
                            attempts: 0,
                            reason: DEADLINE_REASON.to_string(),
                        });
                        break;
                    }
                },
                None => fetch.await,
            };

            match result {
                Ok(listings) => report.pages.push(FetchedPage {
                    page: task.page,
                    listings,
                }),
                Err(e) => {
                    warn!(worker_id, page = task.page, error = %e, "Page skipped");
                    report.skipped.push(SkippedPage {
                        range,
                        page: e.page,
                        attempts: e.attempts,
                        reason: e.reason,
                    });
                }
            }
        }

        if let Err(e) = session.close().await {
            debug!(worker_id, error = %e, "Failed to close worker session");
        }
        debug!(worker_id, pages = report.pages.len(), "Worker finished");
        report
    }
}
