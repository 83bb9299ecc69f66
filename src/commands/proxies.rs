use anyhow::{Context, Result};
use futures::future::join_all;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use bums_runner::client::{BumsClient, ClientConfig, RemoteClient};
use bums_runner::config::{load_proxies, Config};

pub async fn proxies(config: &Config, path: &Path) -> Result<()> {
    let proxies = load_proxies(path)?;
    if proxies.is_empty() {
        println!("No proxies configured in {}", path.display());
        return Ok(());
    }

    let client = BumsClient::new(ClientConfig::from(config)).context("Failed to build HTTP client")?;
    let cancel = CancellationToken::new();

    println!("Resolving {} proxies...", proxies.len());
    println!("================================");

    let lookups = proxies
        .iter()
        .map(|proxy| client.resolve_external_ip(proxy, &cancel));
    let results = join_all(lookups).await;

    let mut failed = 0;
    for (i, (proxy, result)) in proxies.iter().zip(results).enumerate() {
        match result {
            Ok(ip) => println!("{:>3}. {} -> {ip}", i + 1, proxy.display_host()),
            Err(e) => {
                failed += 1;
                println!("{:>3}. {} -> error: {e}", i + 1, proxy.display_host());
            }
        }
    }

    println!("\n{} resolved, {failed} failed", proxies.len() - failed);
    Ok(())
}
