//! Demo: Order Stream
//!
//! Authenticates with BITTREX_API_KEY / BITTREX_API_SECRET and prints account
//! order updates until Ctrl-C.
//!
//! Run: cargo run --bin order_stream

use bittrex_auth::Credentials;
use bittrex_ws::{StreamClient, StreamConfig, StreamEvent};
use colored::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = StreamConfig::new().with_credentials(Credentials::from_env()?);
    let client = StreamClient::new(config);
    let (tx, mut events) = mpsc::channel(256);
    let stop = CancellationToken::new();

    let session = tokio::spawn({
        let stop = stop.clone();
        async move { client.subscribe_order_updates(tx, stop).await }
    });

    tokio::spawn({
        let stop = stop.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            stop.cancel();
        }
    });

    println!("{} Waiting for order updates (Ctrl-C to stop)", "→".cyan());

    while let Some(event) = events.recv().await {
        if let StreamEvent::Order(update) = event {
            let order = &update.delta;
            let change = format!("{:?}", update.change_type);
            let change = if update.change_type.is_terminal() {
                change.red()
            } else {
                change.green()
            };
            println!(
                "  #{:<6} {:<8} {} {:?} {} filled {}/{}",
                update.sequence,
                change,
                order.market_symbol,
                order.direction,
                order.id,
                order.fill_quantity,
                order
                    .quantity
                    .map(|q| q.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    let end = session.await??;
    println!("\n{} session ended: {:?}", "✓".green(), end);
    Ok(())
}
