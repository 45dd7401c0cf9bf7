//! Fan-in: three airlines issue tickets, one loop prints them all
//!
//! Run with: cargo run --example fan_in

use std::time::Duration;

use fanweld::prelude::*;
use tracing_subscriber::EnvFilter;

fn generate_tickets(token: &CancellationToken, airline: &'static str) -> Stream<String> {
    let tickets = (1..=10).map(move |n| format!("{} Ticket #{}", airline, n));
    interval(token, Duration::from_millis(200), tickets)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    fanweld::cancel::cancel_on_ctrl_c(token.clone());

    let tickets = merge(
        &token,
        vec![
            generate_tickets(&token, "Ryanair"),
            generate_tickets(&token, "Lufthansa"),
            generate_tickets(&token, "EasyJet"),
        ],
    );

    let mut sink = PrintSink::with_prefix("[Ticket]");
    let count = drain(&token, tickets, &mut sink).await?;
    println!("{} tickets issued", count);
    Ok(())
}
