//! Demo: Market Snapshot
//!
//! Fetches a market's ticker and orderbook over REST.
//!
//! Run: cargo run --bin market_snapshot -- ETH-BTC

use bittrex_rest::BittrexRestClient;
use colored::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let market = std::env::args().nth(1).unwrap_or_else(|| "ETH-BTC".to_string());
    let client = BittrexRestClient::new()?;

    let ticker = client.get_ticker(&market).await?;
    println!("{}", format!("  {}", ticker.symbol).cyan().bold());
    println!("  last   {}", ticker.last_trade_rate);
    println!("  spread {}  mid {}", ticker.spread(), ticker.mid_price());

    let book = client.get_orderbook(&market, Some(25)).await?;
    println!();
    println!("  {:>16}  {:>16}", "BID".green().bold(), "ASK".red().bold());
    for (bid, ask) in book.bid.iter().zip(book.ask.iter()).take(10) {
        println!(
            "  {:>16}  {:>16}",
            format!("{} @ {}", bid.quantity, bid.rate),
            format!("{} @ {}", ask.quantity, ask.rate)
        );
    }

    Ok(())
}
