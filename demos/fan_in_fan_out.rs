//! Fan-in two file sources, then fan every stage out over all CPUs
//!
//! Run with: cargo run --example fan_in_fan_out

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

fn step(step: &'static str) -> MapStage<impl Fn(File) -> File + Send + Sync + 'static> {
    MapStage::new(move |mut file: File| {
        let note = format!("-> {}[{}]", step, file.name);
        file.data.push_str(&note);
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

    let files = generate_files(1000);
    let (first, second) = files.split_at(500);
    let input = merge(
        &token,
        vec![
            from_iter(&token, first.to_vec(), 1),
            from_iter(&token, second.to_vec(), 1),
        ],
    );

    let mut pipeline = Pipeline::new();
    pipeline
        .add_stage(step("Step1"))
        .add_stage(step("Step2"))
        .add_stage(DelayStage::new(Duration::from_millis(1)))
        .add_stage(step("Step3"))
        .add_stage(step("Step4"));
    tracing::info!(workers = %pipeline.config().workers, "fanning out each stage");

    let mut sink = CountSink::new();
    let processed = pipeline.execute(&token, input);
    let count = drain(&token, processed, &mut sink).await?;

    println!("processed {} files, it took: {:?}", count, start.elapsed());
    Ok(())
}
