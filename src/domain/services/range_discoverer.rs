// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::domain::models::crawl_result::{SkippedRange, DEADLINE_REASON};
use crate::domain::models::price_range::PriceRange;
use crate::engines::count_probe::ResultCounter;
use crate::utils::errors::CrawlError;

/// 发现的区间
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredRange {
    pub range: PriceRange,
    /// 发现阶段探测到的结果数量
    pub count: u64,
    /// 结果数量超出上限但区间已不可再分
    pub capped: bool,
}

/// 区间发现结果
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// 按价格升序排列、两两不相交的区间
    pub ranges: Vec<DiscoveredRange>,
    /// 探测失败或因截止时间未探测而被跳过的区间
    pub skipped: Vec<SkippedRange>,
    /// 探测次数
    pub probes: u32,
    /// 是否因截止时间提前结束
    pub hit_deadline: bool,
}

/// 区间发现器
///
/// 对每个种子区间探测结果数量：
/// - 数量为0：丢弃
/// - 数量不超过上限：原样接受
/// - 数量超过上限：在中点二分后分别处理；不可再分时仍接受并标记为截断
///
/// 设置截止时间后，到期时正在进行的探测被取消，尚未探测的区间记为跳过。
pub struct RangeDiscoverer<'a> {
    counter: &'a dyn ResultCounter,
    deadline: Option<Instant>,
}

impl<'a> RangeDiscoverer<'a> {
    pub fn new(counter: &'a dyn ResultCounter) -> Self {
        Self {
            counter,
            deadline: None,
        }
    }

    /// 设置截止时间
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// 将价格域划分为每段结果数不超过 `cap` 的子区间
    ///
    /// # 参数
    ///
    /// * `domain` - 完整价格域
    /// * `cap` - 单次查询可通过分页访问的最大结果数
    /// * `seeds` - 初始划分；为空时以整个价格域为种子
    ///
    /// # 返回值
    ///
    /// * `Ok(Discovery)` - 升序、互不相交的区间及跳过记录
    /// * `Err(CrawlError::InvalidSeeds)` - 种子越界、重叠或未覆盖价格域
    pub async fn discover(
        &self,
        domain: PriceRange,
        cap: u64,
        seeds: &[PriceRange],
    ) -> Result<Discovery, CrawlError> {
        let seeds = validate_seeds(domain, seeds)?;
        let mut discovery = Discovery::default();

        // Work stack instead of recursion; the top is always the lowest pending range
        let mut stack: Vec<PriceRange> = seeds.into_iter().rev().collect();

        while let Some(range) = stack.pop() {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                stack.push(range);
                Self::skip_pending(&mut discovery, &mut stack);
                break;
            }

            discovery.probes += 1;
            let probe = self.counter.count(&range);
            let result = match self.deadline {
                Some(d) => match timeout_at(d, probe).await {
                    Ok(result) => result,
                    Err(_) => {
                        stack.push(range);
                        Self::skip_pending(&mut discovery, &mut stack);
                        break;
                    }
                },
                None => probe.await,
            };

            let count = match result {
                Ok(count) => count,
                Err(e) => {
                    warn!(range = %range, error = %e, "Probe failed, skipping range");
                    discovery.skipped.push(SkippedRange {
                        range,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if count == 0 {
                debug!(range = %range, "Empty range discarded");
                continue;
            }

            if count <= cap {
                debug!(range = %range, count, "Range accepted");
                discovery.ranges.push(DiscoveredRange {
                    range,
                    count,
                    capped: false,
                });
                continue;
            }

            match range.bisect() {
                Some((low, high)) => {
                    debug!(range = %range, count, cap, "Range over cap, bisecting");
                    stack.push(high);
                    stack.push(low);
                }
                None => {
                    warn!(
                        range = %range,
                        count,
                        cap,
                        "Range over cap cannot be split further, results beyond the cap are unreachable"
                    );
                    discovery.ranges.push(DiscoveredRange {
                        range,
                        count,
                        capped: true,
                    });
                }
            }
        }

        info!(
            ranges = discovery.ranges.len(),
            skipped = discovery.skipped.len(),
            probes = discovery.probes,
            hit_deadline = discovery.hit_deadline,
            "Range discovery finished"
        );
        Ok(discovery)
    }

    /// 将尚未探测的区间按升序记为跳过
    fn skip_pending(discovery: &mut Discovery, stack: &mut Vec<PriceRange>) {
        warn!(pending = stack.len(), "Crawl deadline reached during range discovery");
        discovery.hit_deadline = true;
        discovery
            .skipped
            .extend(stack.drain(..).rev().map(|range| SkippedRange {
                range,
                reason: DEADLINE_REASON.to_string(),
            }));
    }
}

/// 校验种子区间
///
/// 种子必须位于价格域内、两两不相交，并且排序后连续覆盖整个价格域。
pub fn validate_seeds(domain: PriceRange, seeds: &[PriceRange]) -> Result<Vec<PriceRange>, CrawlError> {
    if seeds.is_empty() {
        return Ok(vec![domain]);
    }

    let mut sorted = seeds.to_vec();
    sorted.sort_by_key(|r| (r.min(), r.max()));

    if let Some(outside) = sorted.iter().find(|s| !domain.contains(s)) {
        return Err(CrawlError::InvalidSeeds(format!(
            "seed {} lies outside domain {}",
            outside, domain
        )));
    }

    let mut expected_min = domain.min();
    for (i, seed) in sorted.iter().enumerate() {
        if i > 0 && seed.overlaps(&sorted[i - 1]) {
            return Err(CrawlError::InvalidSeeds(format!(
                "seed {} overlaps {}",
                seed,
                sorted[i - 1]
            )));
        }
        if seed.min() != expected_min {
            return Err(CrawlError::InvalidSeeds(format!(
                "gap before seed {}: expected it to start at {}",
                seed, expected_min
            )));
        }
        expected_min = seed.max().saturating_add(1);
    }

    let last = sorted[sorted.len() - 1];
    if last.max() != domain.max() {
        return Err(CrawlError::InvalidSeeds(format!(
            "seeds end at {} but domain ends at {}",
            last.max(),
            domain.max()
        )));
    }

    Ok(sorted)
}
