//! Demo: Market Stream
//!
//! Streams ticker and 25-level orderbook updates for one market until Ctrl-C.
//!
//! Run: cargo run --bin market_stream -- USD-BTC

use bittrex_ws::{MarketFeed, StreamClient, StreamConfig, StreamEvent};
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

    let market = std::env::args().nth(1).unwrap_or_else(|| "USD-BTC".to_string());
    let feed = MarketFeed::new(market.parse()?);

    println!("{}", "═".repeat(65).cyan());
    println!("{}", format!("  MARKET STREAM  {}", feed.market).cyan().bold());
    println!("{}", "═".repeat(65).cyan());

    let client = StreamClient::new(StreamConfig::new());
    let (tx, mut events) = mpsc::channel(256);
    let stop = CancellationToken::new();

    let session = tokio::spawn({
        let stop = stop.clone();
        async move { client.subscribe_updates(feed, tx, stop).await }
    });

    tokio::spawn({
        let stop = stop.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            stop.cancel();
        }
    });

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Ticker(ticker) => {
                println!(
                    "  {:>10}  last {:>14}  bid {:>14}  ask {:>14}",
                    "TICKER".green(),
                    ticker.last_trade_rate,
                    ticker.bid_rate,
                    ticker.ask_rate
                );
            }
            StreamEvent::OrderBook(book) => {
                let bid = book.best_bid().map(|l| l.rate.to_string()).unwrap_or_default();
                let ask = book.best_ask().map(|l| l.rate.to_string()).unwrap_or_default();
                println!(
                    "  {:>10}  seq {:>14}  bid {:>14}  ask {:>14}",
                    "BOOK".yellow(),
                    book.sequence.map(|s| s.to_string()).unwrap_or_default(),
                    bid,
                    ask
                );
            }
            other => println!("  {:>10}  {}", other.kind().white(), other.key()),
        }
    }

    let end = session.await??;
    println!("\n{} session ended: {:?}", "✓".green(), end);
    Ok(())
}
