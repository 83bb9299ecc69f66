use anyhow::Result;
use std::path::Path;

use bums_runner::config::{load_accounts, load_proxies, Roster};
use bums_runner::pipeline::NO_PROXY;

pub fn accounts(accounts_path: &Path, proxies_path: &Path) -> Result<()> {
    let roster = Roster::new(load_accounts(accounts_path)?, load_proxies(proxies_path)?);

    println!("Accounts ({})", roster.len());
    println!("================================");

    for (i, account) in roster.accounts().iter().enumerate() {
        let id = account
            .identity()
            .map(|identity| identity.id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let proxy = roster
            .proxy_for(i)
            .map(|p| p.display_host())
            .unwrap_or_else(|| NO_PROXY.to_string());

        println!("{:>3}. {} (id: {id}) via {proxy}", i + 1, account.display_name());
    }

    let unmatched = roster.proxies().len().saturating_sub(roster.len());
    if unmatched > 0 {
        println!("\n{unmatched} proxies have no matching account");
    }

    Ok(())
}
