use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use panoq_core::api::{BookmarkFilter, GalleryClient, ImageQuery};
use panoq_core::config::GovernorConfig;
use panoq_core::domain::RequestOptions;
use panoq_core::impls::ReqwestTransport;
use panoq_core::queue::RequestQueue;

/// Command line client for the panorama gallery API.
#[derive(Debug, Parser)]
#[command(name = "panoq")]
#[command(about = "panoq: queued, retrying client for the panorama gallery API", long_about = None)]
pub struct Cli {
    /// Override PANOQ_API_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override PANOQ_MAX_CONCURRENCY.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Retry budget for every request (extra attempts after the first).
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List one page of images.
    Images {
        /// Free text search.
        #[arg(long)]
        search: Option<String>,

        /// all | bookmarked | unbookmarked
        #[arg(long, default_value = "all")]
        filter: BookmarkFilter,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Show bookmark and size analytics.
    Analytics,

    /// Bookmark an image (or clear the bookmark with --off).
    Bookmark {
        id: String,

        #[arg(long)]
        off: bool,
    },

    /// Delete an image.
    Delete { id: String },

    /// GET each URL through the queue and report statuses.
    Probe {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        let mut config = GovernorConfig::from_env().context("invalid PANOQ_* environment")?;
        if let Some(base_url) = cli.base_url {
            config.api_base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(concurrency) = cli.concurrency {
            config.max_concurrency = concurrency;
        }
        config.validate().context("invalid command line overrides")?;
        tracing::debug!(?config, "loaded config");

        let transport = ReqwestTransport::new(config.attempt_timeout())
            .context("failed to build http transport")?;
        let queue = RequestQueue::from_config(&config, Arc::new(transport));
        let client = GalleryClient::from_config(queue.clone(), &config).with_retry_budget(cli.retries);

        let result = cli.command.run(&client, cli.retries).await;
        queue.shutdown_and_join().await;
        result
    }
}

impl CliCommand {
    async fn run(self, client: &GalleryClient, retries: Option<u32>) -> Result<()> {
        match self {
            CliCommand::Images {
                search,
                filter,
                page,
            } => {
                let mut query = ImageQuery::page(page).with_filter(filter);
                if let Some(search) = search {
                    query = query.with_search(search);
                }
                print_json(&client.list_images(&query).await?)
            }
            CliCommand::Analytics => print_json(&client.analytics().await?),
            CliCommand::Bookmark { id, off } => print_json(&client.set_bookmark(&id, !off).await?),
            CliCommand::Delete { id } => {
                let result = client.delete_image(&id).await?;
                print_json(&result)?;
                if !result.success {
                    anyhow::bail!("server refused to delete image {id}");
                }
                Ok(())
            }
            CliCommand::Probe { urls } => probe(client.queue(), urls, retries).await,
        }
    }
}

/// Submit every URL at once; the queue decides how many run together.
async fn probe(queue: &RequestQueue, urls: Vec<String>, retries: Option<u32>) -> Result<()> {
    let pending: Vec<_> = urls
        .iter()
        .map(|url| queue.enqueue(url.clone(), RequestOptions::get(), retries))
        .collect();
    tracing::info!(submitted = pending.len(), queued = queue.queue_length(), "probe submitted");

    let mut failures = 0_usize;
    for (url, response) in urls.iter().zip(pending) {
        let line = match response.await {
            Ok(response) => json!({ "url": url, "status": response.status, "ok": response.ok() }),
            Err(err) => {
                failures += 1;
                json!({ "url": url, "error": err.to_string() })
            }
        };
        println!("{line}");
    }
    print_json(&queue.stats())?;

    if failures > 0 {
        anyhow::bail!("{failures} of {} probes failed", urls.len());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
