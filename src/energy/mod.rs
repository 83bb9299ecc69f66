//! Energy-split collection protocol
//!
//! Stored energy is converted into coins by submitting it in ten chunks. Each
//! submission is authenticated with an MD5 checksum over the amount, the
//! current collection sequence number and the shared secret, and the server
//! answers with the sequence number the next submission must carry.
//!
//! ```text
//! energy E ──split──▶ [c0, c1, ..., c9]      (Σ ci = E, ci ≤ 300 for i < 9)
//!
//! seq s0 ──submit c0──▶ s1 ──submit c1──▶ s2 ... ──submit c9──▶ s10
//!              │ failure
//!              └──▶ stop, report Σ of accepted chunks
//! ```

use rand::Rng;
use std::time::Duration;

use crate::client::BumsApi;
use crate::utils::error::RemoteError;

/// Number of submissions per collection cycle
pub const CHUNK_COUNT: usize = 10;

/// Upper bound for each of the first nine chunks
pub const MAX_CHUNK: u64 = 300;

/// Ten chunk amounts summing to the energy they were derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyChunkPlan {
    total: u64,
    chunks: [u64; CHUNK_COUNT],
}

impl EnergyChunkPlan {
    /// Split `total` into ten chunks
    ///
    /// Chunk `i < 9` is drawn uniformly from `1..=min(300, remaining / 2)`,
    /// or is 0 once that cap drops below 1. The last chunk takes whatever
    /// remains.
    pub fn generate<R: Rng + ?Sized>(total: u64, rng: &mut R) -> Self {
        let mut chunks = [0u64; CHUNK_COUNT];
        let mut remaining = total;

        for chunk in chunks.iter_mut().take(CHUNK_COUNT - 1) {
            let cap = MAX_CHUNK.min(remaining / 2);
            let amount = if cap < 1 { 0 } else { rng.gen_range(1..=cap) };
            *chunk = amount;
            remaining -= amount;
        }
        chunks[CHUNK_COUNT - 1] = remaining;

        Self { total, chunks }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn chunks(&self) -> &[u64] {
        &self.chunks
    }
}

/// Checksum the server expects with every submission
pub fn collect_hash(amount: u64, seq_no: i64, secret_key: &str) -> String {
    format!("{:x}", md5::compute(format!("{amount}{seq_no}{secret_key}")))
}

/// Result of one collection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOutcome {
    /// Sum of accepted chunks
    pub collected: u64,

    /// Number of accepted submissions
    pub accepted: usize,

    /// Sequence number to use for the next submission
    pub next_seq_no: i64,

    /// Failure that stopped the cycle early
    pub error: Option<RemoteError>,
}

impl CollectionOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives the submission loop for one account
pub struct EnergyCollector<'a> {
    api: BumsApi<'a>,
    secret_key: &'a str,
    step_delay: Duration,
}

impl<'a> EnergyCollector<'a> {
    pub fn new(api: BumsApi<'a>, secret_key: &'a str, step_delay: Duration) -> Self {
        Self {
            api,
            secret_key,
            step_delay,
        }
    }

    /// Submit every chunk of `plan` in order, threading the server-issued
    /// sequence number from each response into the next request
    pub async fn run(&self, token: &str, plan: &EnergyChunkPlan, start_seq_no: i64) -> CollectionOutcome {
        let mut outcome = CollectionOutcome {
            collected: 0,
            accepted: 0,
            next_seq_no: start_seq_no,
            error: None,
        };

        for (i, &amount) in plan.chunks().iter().enumerate() {
            tracing::info!(
                attempt = i + 1,
                of = CHUNK_COUNT,
                amount,
                seq_no = outcome.next_seq_no,
                "Collecting energy"
            );

            let hash = collect_hash(amount, outcome.next_seq_no, self.secret_key);
            match self
                .api
                .collect_coin(token, amount, outcome.next_seq_no, &hash)
                .await
            {
                Ok(next_seq_no) => {
                    outcome.collected += amount;
                    outcome.accepted += 1;
                    outcome.next_seq_no = next_seq_no;
                    tracing::info!(
                        collected = outcome.collected,
                        total = plan.total(),
                        "Collection accepted"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt = i + 1, "Collection rejected, stopping cycle");
                    outcome.error = Some(e);
                    break;
                }
            }

            if i + 1 < CHUNK_COUNT {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        outcome
    }
}
