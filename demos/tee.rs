//! Tee: every order goes to logging, metrics and analytics
//!
//! Run with: cargo run --example tee

use std::time::Duration;

use fanweld::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Order {
    id: u32,
    amount: f64,
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order {{ id: {}, amount: {:.2} }}", self.id, self.amount)
    }
}

async fn consume_slowly(
    token: CancellationToken,
    orders: Stream<Order>,
    label: &'static str,
    delay: Duration,
) -> Result<u64> {
    let mut sink = PrintSink::with_prefix(label);
    let slow = Pipeline::new()
        .workers(WorkerCount::new(1)?)
        .add_stage(DelayStage::new(delay))
        .execute(&token, orders);
    drain(&token, slow, &mut sink).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    fanweld::cancel::cancel_on_ctrl_c(token.clone());

    let orders = (1..=5).map(|id| Order {
        id,
        amount: f64::from(id * 17 % 100 + 1),
    });
    let source = interval(&token, Duration::from_millis(300), orders);

    let (mut sinks, tee_handle) = tee_streams(&token, source, 3, 1);
    let analytics = sinks.pop().expect("three sinks");
    let metrics = sinks.pop().expect("three sinks");
    let logs = sinks.pop().expect("three sinks");

    let (logged, tracked, shared) = tokio::join!(
        consume_slowly(token.clone(), logs, "[Logs] logged", Duration::from_millis(50)),
        consume_slowly(token.clone(), metrics, "[Metrics] tracked", Duration::from_millis(250)),
        consume_slowly(token.clone(), analytics, "[Analytics] shared", Duration::from_millis(450)),
    );

    let received = tee_handle.await.map_err(|e| Error::custom(e.to_string()))?;
    println!(
        "{} orders received; logged {}, tracked {}, shared {}",
        received, logged?, tracked?, shared?
    );
    Ok(())
}
