// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::fake_site::{selectors, FakeFactory, FakeSite, Item};
use super::{fetch_options, probe_options};
use pricecrawl::domain::models::listing::RawListing;
use pricecrawl::domain::models::price_range::PriceRange;
use pricecrawl::domain::services::crawl_orchestrator::{CrawlOrchestrator, CrawlRequest};
use pricecrawl::domain::services::grouping::TitleKey;
use pricecrawl::engines::listing_extractor::SelectorExtractor;
use pricecrawl::utils::errors::CrawlError;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn range(min: u32, max: u32) -> PriceRange {
    PriceRange::new(min, max).unwrap()
}

/// 25件商品，价格 0, 40, ..., 960
fn spread_site() -> Arc<FakeSite> {
    let prices: Vec<u32> = (0..25).map(|i| i * 40).collect();
    FakeSite::new(FakeSite::catalog(&prices), 4)
}

fn orchestrator(site: &Arc<FakeSite>) -> CrawlOrchestrator {
    CrawlOrchestrator::new(
        FakeFactory::new(site.clone()),
        Arc::new(SelectorExtractor::new(&selectors()).unwrap()),
        probe_options(),
        fetch_options(),
    )
}

fn request(site: &Arc<FakeSite>, cap: u64) -> CrawlRequest {
    CrawlRequest {
        query: site.query.clone(),
        domain: range(0, 1000),
        seeds: vec![],
        cap,
        concurrency: 3,
        page_size: 4,
        deadline: None,
    }
}

fn ids(listings: &[RawListing]) -> Vec<String> {
    listings.iter().filter_map(|l| l.id.clone()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_crawl_splits_oversized_domain_and_collects_everything() {
    let site = spread_site();

    let result = orchestrator(&site)
        .crawl(&request(&site, 10), &TitleKey)
        .await
        .unwrap();

    let ranges: Vec<PriceRange> = result.ranges.iter().map(|r| r.range).collect();
    assert_eq!(
        ranges,
        vec![range(0, 250), range(251, 500), range(501, 750), range(751, 1000)]
    );
    assert!(result.ranges.iter().all(|r| r.count <= 10 && !r.capped));
    assert_eq!(
        result.ranges.iter().map(|r| r.total_pages).collect::<Vec<_>>(),
        vec![2, 2, 2, 2]
    );

    assert_eq!(result.listings.len(), 25);
    let unique: HashSet<String> = ids(&result.listings).into_iter().collect();
    assert_eq!(unique.len(), 25);
    assert_eq!(result.variants.len(), 25);
    assert!(result.is_complete());
    assert!(result.finished_at >= result.started_at);
    assert_eq!(site.open_sessions.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_every_range_is_reprobed_before_fetching() {
    let site = spread_site();

    orchestrator(&site)
        .crawl(&request(&site, 10), &TitleKey)
        .await
        .unwrap();

    let probed = site.probed.lock().unwrap().clone();
    for r in [range(0, 250), range(251, 500), range(501, 750), range(751, 1000)] {
        assert_eq!(probed.iter().filter(|p| **p == r).count(), 2, "{}", r);
    }
}

#[tokio::test(start_paused = true)]
async fn test_domain_within_cap_is_fetched_whole() {
    let site = spread_site();

    let result = orchestrator(&site)
        .crawl(&request(&site, 1000), &TitleKey)
        .await
        .unwrap();

    assert_eq!(result.ranges.len(), 1);
    assert_eq!(result.ranges[0].range, range(0, 1000));
    assert_eq!(result.ranges[0].total_pages, 7);
    assert_eq!(result.ranges[0].fetched_pages, 7);
    assert_eq!(result.listings.len(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_page_recovered_on_second_attempt_counted_once() {
    let site = spread_site();
    site.fail_page(range(0, 250), 2, 1);

    let result = orchestrator(&site)
        .crawl(&request(&site, 10), &TitleKey)
        .await
        .unwrap();

    assert!(result.skipped_pages.is_empty());
    assert_eq!(result.listings.len(), 25);
    assert_eq!(site.loads_of(range(0, 250), 2), 1);
}

#[tokio::test(start_paused = true)]
async fn test_page_failing_twice_is_skipped_and_reported() {
    let site = spread_site();
    site.fail_page(range(0, 250), 2, 2);

    let result = orchestrator(&site)
        .crawl(&request(&site, 10), &TitleKey)
        .await
        .unwrap();

    // [0, 250] holds 7 items; page 2 has the last 3
    assert_eq!(result.listings.len(), 22);
    assert_eq!(result.skipped_pages.len(), 1);
    let skipped = &result.skipped_pages[0];
    assert_eq!(skipped.range, range(0, 250));
    assert_eq!(skipped.page, 2);
    assert_eq!(skipped.attempts, 2);
    assert!(!result.is_complete());
    assert_eq!(result.ranges[0].fetched_pages, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unprobeable_subrange_is_skipped_others_continue() {
    let site = spread_site();
    site.kill_range(range(251, 500));

    let result = orchestrator(&site)
        .crawl(&request(&site, 10), &TitleKey)
        .await
        .unwrap();

    assert_eq!(result.skipped_ranges.len(), 1);
    assert_eq!(result.skipped_ranges[0].range, range(251, 500));
    assert_eq!(result.ranges.len(), 3);
    assert_eq!(result.listings.len(), 19);
}

#[tokio::test(start_paused = true)]
async fn test_unprobeable_domain_fails_crawl() {
    let site = spread_site();
    site.kill_range(range(0, 1000));

    let err = orchestrator(&site)
        .crawl(&request(&site, 10), &TitleKey)
        .await
        .unwrap_err();

    match err {
        CrawlError::NoValidRanges { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].range, range(0, 1000));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_domain_yields_empty_complete_result() {
    let site = FakeSite::new(FakeSite::catalog(&[5000, 6000]), 4);

    let result = orchestrator(&site)
        .crawl(&request(&site, 10), &TitleKey)
        .await
        .unwrap();

    assert!(result.listings.is_empty());
    assert!(result.variants.is_empty());
    assert!(result.ranges.is_empty());
    assert!(result.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_seeds_replace_initial_domain_probe() {
    let site = spread_site();
    let mut req = request(&site, 1000);
    req.seeds = vec![range(0, 499), range(500, 1000)];

    let result = orchestrator(&site).crawl(&req, &TitleKey).await.unwrap();

    assert_eq!(result.ranges.len(), 2);
    assert_eq!(result.listings.len(), 25);
    assert!(!site.probed.lock().unwrap().contains(&range(0, 1000)));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_seeds_rejected_before_probing() {
    let site = spread_site();
    let mut req = request(&site, 1000);
    req.seeds = vec![range(0, 400), range(300, 1000)];

    let err = orchestrator(&site).crawl(&req, &TitleKey).await.unwrap_err();

    assert!(matches!(err, CrawlError::InvalidSeeds(_)));
    assert!(site.probed.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_variants_group_titles_case_insensitively() {
    let items = vec![
        Item { id: "A".into(), title: "iPhone 15 128GB".into(), price: 100 },
        Item { id: "B".into(), title: "IPHONE 15 128GB".into(), price: 200 },
        Item { id: "C".into(), title: "Galaxy S24".into(), price: 300 },
        Item { id: "D".into(), title: "iphone 15 128gb".into(), price: 900 },
    ];
    let site = FakeSite::new(items, 4);

    let result = orchestrator(&site)
        .crawl(&request(&site, 2), &TitleKey)
        .await
        .unwrap();

    assert_eq!(result.listings.len(), 4);
    assert_eq!(result.variants.len(), 2);
    assert_eq!(result.variants[0].key, "Galaxy S24");
    assert_eq!(result.variants[1].key, "iPhone 15 128GB");
    assert_eq!(ids(&result.variants[1].listings), vec!["A", "B", "D"]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_grouping_strategy() {
    let site = spread_site();
    let by_price_band = |listing: &RawListing| {
        let price = listing.price.unwrap_or_default() as u32;
        format!("band-{}", price / 500)
    };

    let result = orchestrator(&site)
        .crawl(&request(&site, 1000), &by_price_band)
        .await
        .unwrap();

    assert_eq!(result.variants.len(), 2);
    assert_eq!(result.variants[0].key, "band-0");
    assert_eq!(result.variants[0].listings.len(), 13);
    assert_eq!(result.variants[1].listings.len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_records_unfetched_pages() {
    let prices: Vec<u32> = (0..12).map(|i| i * 10).collect();
    let site = FakeSite::with_delay(FakeSite::catalog(&prices), 2, Duration::from_secs(1));
    let mut req = request(&site, 1000);
    req.page_size = 2;
    req.concurrency = 1;
    req.deadline = Some(Duration::from_secs(4));

    let result = orchestrator(&site).crawl(&req, &TitleKey).await.unwrap();

    assert_eq!(result.ranges.len(), 1);
    let summary = &result.ranges[0];
    assert_eq!(summary.total_pages, 6);
    assert!(!result.skipped_pages.is_empty());
    assert!(result
        .skipped_pages
        .iter()
        .all(|s| s.reason == "crawl deadline reached"));
    assert_eq!(
        summary.fetched_pages as usize + result.skipped_pages.len(),
        6
    );
    assert_eq!(result.listings.len(), summary.fetched_pages as usize * 2);
    assert!(!result.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_slow_discovery() {
    let prices: Vec<u32> = (0..200).map(|i| i * 5).collect();
    let site = FakeSite::with_delay(FakeSite::catalog(&prices), 4, Duration::from_secs(1));
    let mut req = request(&site, 3);
    req.deadline = Some(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    let result = orchestrator(&site).crawl(&req, &TitleKey).await.unwrap();

    assert!(started.elapsed() <= Duration::from_secs(5));
    assert!(site.probed.lock().unwrap().len() <= 5);
    assert!(result.listings.is_empty());
    assert!(!result.skipped_ranges.is_empty());
    assert!(result
        .skipped_ranges
        .iter()
        .all(|s| s.reason == "crawl deadline reached"));
    assert!(!result.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_capped_range_fetches_only_reachable_pages() {
    let prices = vec![7; 30];
    let site = FakeSite::new(FakeSite::catalog(&prices), 4);
    let mut req = request(&site, 10);
    req.domain = range(7, 7);

    let result = orchestrator(&site).crawl(&req, &TitleKey).await.unwrap();

    assert_eq!(result.ranges.len(), 1);
    let summary = &result.ranges[0];
    assert!(summary.capped);
    assert_eq!(summary.count, 30);
    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.fetched_pages, 3);
    assert!(result.skipped_pages.is_empty());
    assert_eq!(result.listings.len(), 12);
    assert_eq!(site.loads_of(range(7, 7), 4), 0);
    assert!(!result.is_complete());
}
