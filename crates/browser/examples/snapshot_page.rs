//! Snapshot a page and re-resolve a few of its paths
//!
//! Needs Chrome started with `--remote-debugging-port=9222`; pass the
//! browser WebSocket URL and a page URL:
//!
//! ```text
//! cargo run --example snapshot_page -- ws://localhost:9222/devtools/browser/<id> https://example.com
//! ```

use domwalk_browser::{BrowserSession, SessionConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let cdp_url = args.next().unwrap_or_else(|| "ws://localhost:9222".to_string());
    let page_url = args.next().unwrap_or_else(|| "https://example.com".to_string());

    let session = BrowserSession::new(SessionConfig {
        cdp_url,
        ..Default::default()
    });
    session.start().await?;
    session.new_tab(Some(page_url)).await?;

    let page = session.page().await?;
    page.wait_until_ready(Duration::from_secs(30)).await?;
    println!("User agent: {}", page.user_agent().await?);

    let records = session.snapshot().await?;
    for record in records.iter().take(20) {
        println!("{}", serde_json::to_string(record)?);
    }

    for record in records.iter().take(5) {
        let nodes = page.resolve(&record.path).await?;
        println!("{} -> {:?} (captured {})", record.path, nodes, record.node);
    }

    session.stop().await?;
    Ok(())
}
