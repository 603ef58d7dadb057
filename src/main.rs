//! Command-line entry point
//!
//! Crawls the seed URLs given on the command line. Flags are deliberately
//! minimal; the library builder is the real configuration surface.
//!
//! ```text
//! canopy-crawler [--max-pages N] [--mode single_domain|cross_domain|whitelist|graph|focused]
//!                [--screenshots] [--dom] [--css] [--compress] [--output DIR] URL...
//! ```

use anyhow::{bail, Result};
use log::{error, info};

use canopy_crawler::{CrawlMode, CrawlerBuilder, Viewport};

struct CliOptions {
    seeds: Vec<String>,
    max_pages: usize,
    mode: Option<CrawlMode>,
    screenshots: bool,
    dom: bool,
    css: bool,
    compress: bool,
    output: String,
}

fn parse_args() -> Result<CliOptions> {
    let mut options = CliOptions {
        seeds: Vec::new(),
        max_pages: 100,
        mode: None,
        screenshots: false,
        dom: false,
        css: false,
        compress: false,
        output: "crawl_data".to_string(),
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--max-pages" => {
                let value = args.next().unwrap_or_default();
                options.max_pages = value.parse()?;
            }
            "--mode" => {
                let value = args.next().unwrap_or_default();
                options.mode = Some(CrawlMode::parse(&value));
            }
            "--screenshots" => options.screenshots = true,
            "--dom" => options.dom = true,
            "--css" => options.css = true,
            "--compress" => options.compress = true,
            "--output" => {
                options.output = args.next().unwrap_or_default();
            }
            other if other.starts_with("--") => bail!("unknown flag: {other}"),
            url => options.seeds.push(url.to_string()),
        }
    }

    if options.seeds.is_empty() {
        bail!("usage: canopy-crawler [--max-pages N] [--mode MODE] [--screenshots] [--dom] [--css] [--compress] [--output DIR] URL...");
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_args()?;

    let mut builder = CrawlerBuilder::new(options.seeds)
        .max_pages(options.max_pages)
        .storage(&options.output, options.compress);

    if let Some(mode) = options.mode {
        builder = builder.with_graph_crawling(mode, 3, 100, None, None, None);
    }
    if options.screenshots || options.dom {
        builder = builder.with_screenshots(Viewport::default(), true);
    }
    if options.dom {
        builder = builder.with_default_dom_extraction();
    }
    if options.css {
        builder = builder.with_default_css_download();
    }

    let crawler = builder.build()?;
    let shutdown = crawler.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing up");
            shutdown.shutdown();
        }
    });

    match crawler.crawl().await {
        Ok(summary) => {
            info!(
                "Done: {} pages, {} duplicate URLs, {} duplicate bodies, {} errors",
                summary.pages_crawled,
                summary.dedup.duplicate_urls,
                summary.dedup.duplicate_content,
                summary.errors.total_errors
            );
            Ok(())
        }
        Err(e) => {
            error!("Crawl failed: {e}");
            Err(e.into())
        }
    }
}
