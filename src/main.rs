use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proxy_search::{
    config::GoogleCredentials,
    download::FileDownloader,
    proxy::{ProxyManager, ProxySource},
    queries::{self, Engine},
    search::{DirectUrlClient, GoogleSearchClient, SearchResult},
    Settings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Search for files and download them through validated proxies
#[derive(Parser)]
#[command(name = "proxy-search")]
#[command(about = "Search for files and download them through validated proxies")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (JSON)
    #[arg(short, long, default_value = "settings.json")]
    settings: PathBuf,

    /// Directory holding proxies.txt and queries.txt
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Proxy list, overriding <config-dir>/proxies.txt
    #[arg(long)]
    proxies: Option<PathBuf>,

    /// Query list, overriding <config-dir>/queries.txt
    #[arg(long)]
    queries: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate proxies, run every query and download the results
    Run,
    /// Validate proxies and print the ranked pool
    Check {
        /// Write working proxies here, fastest first
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("proxy_search={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;

    let proxies_file = cli
        .proxies
        .clone()
        .unwrap_or_else(|| cli.config_dir.join("proxies.txt"));
    let queries_file = cli
        .queries
        .clone()
        .unwrap_or_else(|| cli.config_dir.join("queries.txt"));

    let mut manager = ProxyManager::new(&proxies_file, &settings);

    match cli.command {
        Some(Commands::Check { output }) => {
            let report = manager.validate_proxies().await;

            println!(
                "Results: {} good, {} bad",
                report.pool.len(),
                report.failures().count()
            );

            if !report.pool.is_empty() {
                println!("\nWorking proxies:");
                for entry in report.pool.iter() {
                    println!("  {}", entry);
                }
            }

            let failures: Vec<_> = report.failures().collect();
            if !failures.is_empty() {
                println!("\nFailed proxies:");
                for verdict in failures {
                    println!(
                        "  {} -> {}",
                        verdict.candidate,
                        verdict.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }

            if let Some(path) = output {
                ProxySource::save_to_file(&report.pool.candidates(), &path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("\nSaved {} proxies to {:?}", report.pool.len(), path);
            }
        }
        Some(Commands::Run) | None => {
            manager.validate_proxies().await;
            run_queries(Arc::new(manager), &settings, &queries_file).await;
        }
    }

    Ok(())
}

async fn run_queries(manager: Arc<ProxyManager>, settings: &Settings, queries_file: &Path) {
    let google = GoogleSearchClient::new(GoogleCredentials::from_env())
        .with_user_agent(settings.user_agent.clone())
        .with_proxy_manager(Arc::clone(&manager));
    let direct = DirectUrlClient::new();
    let downloader = FileDownloader::new(&settings.downloads_base_dir)
        .with_user_agent(settings.user_agent.clone())
        .with_proxy_manager(manager);

    let queries = queries::load(queries_file);
    if queries.is_empty() {
        warn!(
            "No queries loaded. Add some to {} and try again.",
            queries_file.display()
        );
        return;
    }

    for query in queries {
        info!(
            "Running query: engine={}, query={:?}, max_results={}, subdir={}",
            query.engine, query.query, query.max_results, query.download_subdir
        );

        let results: Vec<SearchResult> = match &query.engine {
            Engine::Google if !google.is_configured() => {
                warn!("Google not configured (GOOGLE_API_KEY/GOOGLE_CX). Skipping query.");
                continue;
            }
            Engine::Google => match google.search(&query.query, query.max_results).await {
                Ok(results) => results,
                Err(e) if e.is_network() => {
                    warn!("Search for {:?} failed: {}", query.query, e);
                    continue;
                }
                Err(e) => {
                    error!("Search for {:?} returned an unusable answer: {}", query.query, e);
                    continue;
                }
            },
            Engine::Direct => direct.search(&query.query, query.max_results),
            Engine::Other(name) => {
                warn!("Unknown engine: {}. Skipping.", name);
                continue;
            }
        };

        for result in results {
            info!("Result: {}", result.url);
            downloader.download(&result.url, &query.download_subdir).await;
        }
    }
}
