pub mod accounts;
pub mod proxies;
pub mod run;

// Re-export command functions for convenience
pub use accounts::accounts;
pub use proxies::proxies;
pub use run::{run, RunParams};
