//! A four-stage pipeline annotating files as they pass through
//!
//! Run with: cargo run --example pipeline

use std::time::{Duration, Instant};

use fanweld::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct File {
    name: String,
    data: String,
}

fn generate_files(count: usize) -> Vec<File> {
    (1..=count)
        .map(|i| File {
            name: format!("file{}", i),
            data: format!("Data for file{}", i),
        })
        .collect()
}

fn annotate(stage: &'static str) -> MapStage<impl Fn(File) -> File + Send + Sync + 'static> {
    MapStage::new(move |mut file: File| {
        file.data.push_str(" -> ");
        file.data.push_str(stage);
        file
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let start = Instant::now();
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let input = from_iter(&token, generate_files(1000), 1);

    // One worker per stage: a plain assembly line.
    let mut pipeline = Pipeline::new();
    pipeline
        .workers(WorkerCount::new(1)?)
        .add_stage(annotate("Stage1"))
        .add_stage(annotate("Stage2"))
        .add_stage(DelayStage::new(Duration::from_millis(1)))
        .add_stage(annotate("Stage3"))
        .add_stage(annotate("Stage4"));

    let processed = pipeline.execute(&token, input);
    while let Some(file) = processed.recv().await {
        println!("Processed File: {} Data: {}", file.name, file.data);
    }

    println!("it took: {:?}", start.elapsed());
    Ok(())
}
