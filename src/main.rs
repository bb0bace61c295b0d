//! gscrape CLI - paginated Google scraping from the command line.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use gscrape::{date_range_tbs, query::ParamMap, ClientConfig, GoogleScraper};

/// Scrape Google result pages and print the outbound URLs
#[derive(Parser)]
#[command(name = "gscrape")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Search query
    query: String,

    /// Top-level domain of the engine (e.g. "com", "de", "co.uk")
    #[arg(short, long, default_value = "com")]
    tld: String,

    /// Stop once this many URLs have been collected
    #[arg(short, long, default_value = "100")]
    max_results: usize,

    /// Results per page (left off the wire when it equals the engine default)
    #[arg(short, long)]
    num: Option<u32>,

    /// Zero-based result offset to start scraping from
    #[arg(short, long)]
    start: Option<u32>,

    /// Minimum delay between page requests, in seconds
    #[arg(long, default_value = "8")]
    min_sleep: u64,

    /// Maximum delay between page requests, in seconds
    #[arg(long, default_value = "18")]
    max_sleep: u64,

    /// Only results published on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Only results published on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Proxy URL (e.g. http://127.0.0.1:8080 or socks5://127.0.0.1:1080)
    #[arg(short, long)]
    proxy: Option<String>,

    /// Pin an explicit user agent instead of a random pool pick
    #[arg(short, long)]
    user_agent: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One URL per line
    Text,
    /// JSON object with urls and error code
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let mut search_params = ParamMap::new();
    search_params.insert("q".to_string(), vec![cli.query.clone()]);
    if cli.from.is_some() || cli.to.is_some() {
        search_params.insert("tbs".to_string(), vec![date_range_tbs(cli.from, cli.to)]);
    }
    if let Some(num) = cli.num {
        search_params.insert("num".to_string(), vec![num.to_string()]);
    }
    if let Some(start) = cli.start {
        search_params.insert("start".to_string(), vec![start.to_string()]);
    }

    let mut config = ClientConfig::new()
        .with_tld(&cli.tld)
        .with_search_params(search_params)
        .with_max_results(cli.max_results)
        .with_sleep_bounds(cli.min_sleep, cli.max_sleep)
        .with_debug(cli.verbose);
    if let Some(proxy) = &cli.proxy {
        config = config.with_proxy(proxy);
    }
    if let Some(user_agent) = &cli.user_agent {
        config = config.with_user_agent(user_agent);
    }

    let mut scraper = GoogleScraper::new(config)?;
    let outcome = scraper.search().await;

    match cli.format {
        OutputFormat::Text => {
            for url in &outcome.urls {
                println!("{}", url);
            }
            if !outcome.is_complete() {
                eprintln!(
                    "Stopped early after {} result(s): {}",
                    outcome.urls.len(),
                    outcome.error_code()
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "urls": outcome.urls,
                "error": outcome.error_code(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
