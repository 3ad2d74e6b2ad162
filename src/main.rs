//! # DOI Harvest
//!
//! A sequential crawler for a publisher's search interface. It collects
//! article DOI links per subject and keyword, then visits each article to
//! extract bibliographic metadata into CSV and JSON files.
//!
//! ## Usage
//!
//! ```sh
//! doi_harvest --config harvest.yaml links --output-dir ./links
//! doi_harvest seed --from ./links/links-accounting/all_accounting_links.json --list urls.txt
//! doi_harvest articles --list urls.txt --output articles.csv
//! ```
//!
//! ## Architecture
//!
//! The application is a pipeline of independent stages:
//! 1. **Links**: paginate search results, deduplicate, write one JSON list
//!    per (subject, keyword) and a master mapping per subject
//! 2. **Seed**: append the collected links to a resumable input list
//! 3. **Articles / Abstracts**: visit every unprocessed entry, append its
//!    data to the output, mark the entry done, pause
//!
//! Every stage can be interrupted and rerun; completed work is skipped.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod collectors;
mod config;
mod error;
mod extract;
mod fetcher;
mod models;
mod outputs;
mod pagination;
mod progress;
mod throttle;
mod utils;

use cli::{Cli, Command};
use collectors::articles::{ArticleCollector, ArticleOutput};
use config::{HarvestConfig, ProxyConfig};
use fetcher::PageFetcher;
use fetcher::http::HttpPageFetcher;
use progress::ProgressList;
use utils::{ensure_writable_dir, load_keywords};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("doi_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = HarvestConfig::load(args.config.as_deref()).await?;
    apply_overrides(&mut config, &args);
    config.validate()?;
    info!(
        subjects = config.subjects.len(),
        page_size = config.page_size,
        timeout_ms = config.timeout_ms,
        delay_min_ms = config.delay.min_ms,
        delay_max_ms = config.delay.max_ms,
        max_retries = config.retry.max_retries,
        "Configuration ready"
    );

    // `seed` never touches the network.
    if let Command::Seed { from, list } = &args.command {
        collectors::seed::seed_list(from, list).await?;
        log_elapsed(start_time);
        return Ok(());
    }

    let mut fetcher = HttpPageFetcher::new(&config)?;
    let outcome = run_stage(&mut fetcher, &config, &args.command).await;
    fetcher.close().await;

    if let Err(e) = outcome {
        error!(error = %e, "Run failed");
        return Err(e);
    }

    log_elapsed(start_time);
    Ok(())
}

/// CLI values win over the configuration file.
fn apply_overrides(config: &mut HarvestConfig, args: &Cli) {
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(url) = &args.proxy {
        match &mut config.proxy {
            Some(proxy) => proxy.url = url.clone(),
            None => {
                config.proxy = Some(ProxyConfig {
                    url: url.clone(),
                    username: None,
                    password: None,
                })
            }
        }
    }
}

async fn run_stage<F: PageFetcher>(
    fetcher: &mut F,
    config: &HarvestConfig,
    command: &Command,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Links { output_dir } => {
            ensure_writable_dir(output_dir).await?;
            let keywords = load_keywords(config).await?;
            collectors::links::collect_links(fetcher, config, &keywords, output_dir).await?;
        }
        Command::Articles {
            list,
            output,
            no_profiles,
        } => {
            let collector =
                ArticleCollector::new(config, ArticleOutput::bibliographic(output, !no_profiles));
            collector.run(fetcher, &ProgressList::new(list)).await?;
        }
        Command::Abstracts { list, output_dir } => {
            ensure_writable_dir(output_dir).await?;
            let collector = ArticleCollector::new(config, ArticleOutput::abstracts(output_dir));
            collector.run(fetcher, &ProgressList::new(list)).await?;
        }
        Command::Seed { .. } => {}
    }
    Ok(())
}

fn log_elapsed(start_time: std::time::Instant) {
    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let args = Cli::parse_from([
            "doi_harvest",
            "--page-size",
            "25",
            "--proxy",
            "http://proxy.local:8080",
            "links",
            "--output-dir",
            "out",
        ]);
        let mut config = HarvestConfig {
            proxy: Some(ProxyConfig {
                url: "http://old:1".into(),
                username: Some("u".into()),
                password: Some("p".into()),
            }),
            ..HarvestConfig::default()
        };

        apply_overrides(&mut config, &args);
        assert_eq!(config.page_size, 25);
        let proxy = config.proxy.unwrap();
        assert_eq!(proxy.url, "http://proxy.local:8080");
        assert_eq!(proxy.username.as_deref(), Some("u"));
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let args = Cli::parse_from(["doi_harvest", "seed", "--from", "a.json", "--list", "l.txt"]);
        let mut config = HarvestConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config, HarvestConfig::default());
    }
}
