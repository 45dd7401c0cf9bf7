//! Fan-out fetching with per-item errors reported by the consumer
//!
//! The fetch is simulated: every seventh URL fails. Press Ctrl-C to cancel.
//!
//! Run with: cargo run --example fetcher

use std::time::{Duration, Instant};

use fanweld::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Fetched {
    url: String,
    status: u16,
}

fn generate_urls(count: usize) -> Vec<String> {
    let domains = ["example.com", "example.org", "example.net", "example.edu", "test.com"];
    (0..count)
        .map(|i| {
            let protocol = if i % 2 == 0 { "http" } else { "https" };
            let domain = domains[i % domains.len()];
            format!("{}://{}/{}/{}/{}", protocol, domain, i % 1000, i * 7 % 1000, i * 13 % 1000)
        })
        .collect()
}

async fn fetch(url: String) -> Result<Fetched> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    if url.len() % 7 == 0 {
        return Err(Error::stage(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            format!("error fetching {}", url),
        )));
    }
    Ok(Fetched { url, status: 200 })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let start = Instant::now();
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    fanweld::cancel::cancel_on_ctrl_c(token.clone());

    let urls = from_iter(&token, generate_urls(1000), 1);
    let workers = WorkerCount::available();
    let results = split(&token, std::sync::Arc::new(TryThenStage::new(fetch)), urls, workers);

    let mut sink = ReportSink::new(|fetched: Fetched| {
        println!("received result: {} ({})", fetched.url, fetched.status);
    });
    match drain(&token, results, &mut sink).await {
        Ok(_) => {}
        Err(Error::Cancelled) => println!("cancelled"),
        Err(e) => return Err(e),
    }

    let report = sink.report();
    println!(
        "{} fetched, {} failed with {} workers, it took: {:?}",
        report.succeeded,
        report.failed,
        workers,
        start.elapsed()
    );
    Ok(())
}
