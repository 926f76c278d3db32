use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use learnify::config::Config;
use learnify::data_models::NotificationPayload;
use learnify::notifications::NotificationQueue;
use learnify::provider::YouTubeClient;
use learnify::search::{DebouncedSearch, SearchSnapshot, SearchStatus};

/// Search educational videos, typing the query as a user would.
#[derive(Parser, Debug)]
#[command(name = "learnify", version)]
struct Args {
    /// Search terms
    #[arg(required = true)]
    query: Vec<String>,

    /// Quiet period before a lookup fires (overrides SEARCH_DEBOUNCE_MS)
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Delay between simulated keystrokes
    #[arg(long, default_value_t = 60)]
    keystroke_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (also picks up the library's log records)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(ms) = args.debounce_ms {
        config.search_debounce_ms = ms;
    }

    let toasts = NotificationQueue::new(config.queue_settings());
    let provider = Arc::new(YouTubeClient::from_config(&config));
    if !provider.has_credentials() {
        tracing::warn!("YOUTUBE_API_KEY is not set; the search will fail");
    }
    let search = DebouncedSearch::new(provider, config.search_settings());

    let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<SearchSnapshot>();
    let watcher = search.subscribe(move |snapshot: &SearchSnapshot| {
        if matches!(
            snapshot.status,
            SearchStatus::Resolved | SearchStatus::Failed
        ) {
            let _ = settled_tx.send(snapshot.clone());
        }
    });

    let query = args.query.join(" ");
    let mut typed = String::new();
    for ch in query.chars() {
        typed.push(ch);
        search.set_query(typed.clone());
        tokio::time::sleep(Duration::from_millis(args.keystroke_ms)).await;
    }

    let settled = tokio::time::timeout(Duration::from_secs(30), settled_rx.recv())
        .await
        .context("timed out waiting for the search to settle")?
        .context("search controller shut down before settling")?;
    watcher.unsubscribe();

    match settled.status {
        SearchStatus::Failed => {
            toasts.enqueue(
                NotificationPayload::new()
                    .title("Search failed")
                    .description(settled.error.clone().unwrap_or_default())
                    .destructive(),
            );
        }
        _ => {
            for (i, video) in settled.results.iter().enumerate() {
                println!(
                    "{:>2}. {} [{}]\n    {}",
                    i + 1,
                    video.title,
                    video.channel_title,
                    video.watch_url()
                );
            }
            toasts.enqueue(
                NotificationPayload::new()
                    .title("Videos loaded")
                    .description(format!(
                        "{} results for \"{}\"",
                        settled.results.len(),
                        settled.query
                    )),
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&toasts.snapshot())?);
    Ok(())
}
