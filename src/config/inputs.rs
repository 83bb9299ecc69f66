//! Account and proxy list loading
//!
//! Both files are plain text with one entry per line. Carriage returns are
//! stripped and blank lines ignored. Proxies are matched to accounts by line
//! position; a shorter proxy list leaves the remaining accounts on a direct
//! connection.

use std::path::Path;
use std::sync::Arc;

use crate::models::{AccountCredential, ProxyBinding};
use crate::utils::error::InputError;
use crate::utils::split_lines;

/// Load account credentials. A missing or empty file is fatal.
pub fn load_accounts(path: &Path) -> Result<Vec<AccountCredential>, InputError> {
    if !path.exists() {
        return Err(InputError::AccountsNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let accounts: Vec<_> = split_lines(&content)
        .map(AccountCredential::new)
        .collect();

    if accounts.is_empty() {
        return Err(InputError::NoAccounts(path.display().to_string()));
    }

    let unnamed = accounts.iter().filter(|a| a.identity().is_none()).count();
    if unnamed > 0 {
        tracing::warn!(
            count = unnamed,
            "Some credentials carry no decodable user field; they will be logged as 'unknown'"
        );
    }

    Ok(accounts)
}

/// Load proxy URIs. A missing file means no proxies.
pub fn load_proxies(path: &Path) -> Result<Vec<ProxyBinding>, InputError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Proxy file not found, using direct connections");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.display().to_string(),
        source,
    })?;

    Ok(split_lines(&content).map(ProxyBinding::new).collect())
}

/// Read-only account and proxy lists shared by every pipeline of a pass
#[derive(Debug, Clone)]
pub struct Roster {
    accounts: Arc<[AccountCredential]>,
    proxies: Arc<[ProxyBinding]>,
}

impl Roster {
    pub fn new(accounts: Vec<AccountCredential>, proxies: Vec<ProxyBinding>) -> Self {
        Self {
            accounts: accounts.into(),
            proxies: proxies.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn account(&self, index: usize) -> Option<&AccountCredential> {
        self.accounts.get(index)
    }

    /// Proxy bound to the account at `index`, if the proxy list reaches it
    pub fn proxy_for(&self, index: usize) -> Option<&ProxyBinding> {
        self.proxies.get(index)
    }

    pub fn accounts(&self) -> &[AccountCredential] {
        &self.accounts
    }

    pub fn proxies(&self) -> &[ProxyBinding] {
        &self.proxies
    }
}
