// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{anyhow, Context};
use pricecrawl::config::settings::Settings;
use pricecrawl::domain::services::crawl_orchestrator::{CrawlOrchestrator, CrawlRequest};
use pricecrawl::domain::services::grouping::TitleKey;
use pricecrawl::engines::chromium_engine::ChromiumSessionFactory;
use pricecrawl::engines::listing_extractor::SelectorExtractor;
use pricecrawl::infrastructure::ingest_client::{IngestClient, IngestMeta};
use pricecrawl::utils::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 主函数
///
/// 依次执行配置中的每个搜索，按标题分组，配置了上传地址时上传结果
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting pricecrawl...");

    // 2. Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    if settings.searches.is_empty() {
        warn!("No searches configured, nothing to do");
        return Ok(());
    }

    let extractor = SelectorExtractor::new(&settings.selectors)
        .map_err(|e| anyhow!("Invalid selector configuration: {}", e))?;

    // 3. Browser
    let factory = Arc::new(
        ChromiumSessionFactory::launch(&settings.browser)
            .await
            .context("Failed to start browser")?,
    );

    let orchestrator = CrawlOrchestrator::new(
        factory,
        Arc::new(extractor),
        settings.crawl.probe_options(&settings.selectors),
        settings.crawl.fetch_options(&settings.selectors),
    );

    let ingest = settings.ingest.endpoint.as_ref().map(|endpoint| {
        IngestClient::new(
            endpoint.clone(),
            Duration::from_secs(settings.ingest.timeout_secs),
        )
    });

    // 4. Run searches
    for search in &settings.searches {
        let query = search
            .query()
            .with_context(|| format!("Invalid base_url for search '{}'", search.name))?;

        let request = CrawlRequest {
            query,
            domain: search.domain,
            seeds: search.seed_ranges.clone(),
            cap: settings.crawl.result_cap,
            concurrency: settings.crawl.concurrency,
            page_size: settings.crawl.page_size,
            deadline: settings.crawl.deadline(),
        };

        info!(search = %search.name, domain = %search.domain, "Starting crawl");
        let result = match orchestrator.crawl(&request, &TitleKey).await {
            Ok(result) => result,
            Err(e) => {
                error!(search = %search.name, error = %e, "Crawl failed");
                continue;
            }
        };

        info!(
            search = %search.name,
            listings = result.listings.len(),
            variants = result.variants.len(),
            seconds = result.duration().num_seconds(),
            "Crawl summary"
        );
        if !result.is_complete() {
            for skipped in &result.skipped_ranges {
                warn!(range = %skipped.range, reason = %skipped.reason, "Skipped range");
            }
            for skipped in &result.skipped_pages {
                warn!(range = %skipped.range, page = skipped.page, reason = %skipped.reason, "Skipped page");
            }
        }

        if let Some(client) = &ingest {
            let meta = IngestMeta {
                competitor: settings.ingest.competitor.clone(),
                category_name: settings.ingest.category_name.clone(),
                subcategory_name: settings
                    .ingest
                    .subcategory_name
                    .clone()
                    .unwrap_or_else(|| search.name.clone()),
                model_name: search.name.clone(),
            };
            let summary = client.upload(&result, &meta).await;
            info!(
                search = %search.name,
                accepted = summary.accepted,
                failed = summary.failed,
                "Upload finished"
            );
        }
    }

    Ok(())
}
