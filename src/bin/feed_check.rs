//! Binary to start the ANT market feed, subscribe the NIFTY, BANKNIFTY and
//! India VIX indices and print their latest quotes for inspecting live data.
//!
//! # Usage
//!
//! ```sh
//! export ANT_ACCESS_TOKEN="your-access-token"
//! # optional overrides
//! export ANT_BASE_URL="https://ant.aliceblueonline.com"
//! export ANT_WS_URL="wss://ant.aliceblueonline.com/hydrasocket/v2/websocket"
//! cargo run --bin feed_check --features cli
//! ```

use std::env;
use std::time::Duration;

use ant_feed::api::contracts::MasterContractDirectory;
use ant_feed::client::AntClient;
use ant_feed::constants::{API_BASE_URL, BANKNIFTY_INDEX, INDIA_VIX_INDEX, NIFTY_INDEX};
use ant_feed::error::FeedError;
use ant_feed::feed::FeedSystemBuilder;
use ant_feed::provider::StaticToken;
use tokio::time;

#[tokio::main]
async fn main() -> ant_feed::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let access_token = env::var("ANT_ACCESS_TOKEN")
        .map_err(|_| FeedError::Auth("set ANT_ACCESS_TOKEN env var before running".into()))?;
    let base_url = env::var("ANT_BASE_URL").unwrap_or_else(|_| API_BASE_URL.to_owned());

    let client = AntClient::with_base_url(access_token.as_str(), base_url)?;
    let mut builder = FeedSystemBuilder::new(
        StaticToken::new(access_token),
        MasterContractDirectory::new(client),
    )
    .open_timeout(Duration::from_secs(30));
    if let Ok(ws_url) = env::var("ANT_WS_URL") {
        builder = builder.url(ws_url);
    }
    let feed = builder.build();

    println!("Starting ANT market feed…");
    feed.start().await?;

    println!("Printing index quotes for 10 seconds…");
    println!("(Note: data only arrives during market hours 9:15–15:30 IST)\n");

    let mut ticker = time::interval(Duration::from_secs(1));
    for _ in 0..10 {
        ticker.tick().await;
        for symbol in [NIFTY_INDEX, BANKNIFTY_INDEX, INDIA_VIX_INDEX] {
            match feed.index_quote(symbol) {
                Ok(tick) => println!("{symbol:>12}: {:.2}", tick.ltp().value()),
                Err(e) => println!("{symbol:>12}: {e}"),
            }
        }
        println!();
    }

    println!(
        "Reconnects: {}, cached instruments: {}",
        feed.connection().reconnect_count(),
        feed.option_chain().len()
    );
    feed.stop().await;
    println!("Done.");

    Ok(())
}
