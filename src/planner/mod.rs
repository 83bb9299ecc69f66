//! Upgrade planning
//!
//! Greedy selection of upgrades by hourly yield. The planner never re-fetches
//! the catalog mid-cycle; spending is tracked on a local [`Budget`].

use crate::models::UpgradeOption;

/// Simulated balance for one upgrade cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    remaining: i64,
    spent: i64,
}

impl Budget {
    pub fn new(balance: i64) -> Self {
        Self {
            remaining: balance,
            spent: 0,
        }
    }

    pub fn affords(&self, cost: i64) -> bool {
        cost <= self.remaining
    }

    /// Deduct a purchase that the server accepted
    pub fn spend(&mut self, cost: i64) {
        self.remaining -= cost;
        self.spent += cost;
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn spent(&self) -> i64 {
        self.spent
    }
}

/// Selection policy for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradePlanner {
    /// Most the account may pay for any single upgrade
    pub max_cost: i64,
}

impl UpgradePlanner {
    pub fn new(max_cost: i64) -> Self {
        Self { max_cost }
    }

    /// Eligible options costing at most `min(balance, max_cost)`, best
    /// hourly yield first. Equal yields keep catalog order.
    pub fn candidates<'a>(&self, balance: i64, catalog: &'a [UpgradeOption]) -> Vec<&'a UpgradeOption> {
        let limit = balance.min(self.max_cost);

        let mut candidates: Vec<_> = catalog
            .iter()
            .filter(|option| option.eligible && option.cost <= limit)
            .collect();

        // sort_by is stable
        candidates.sort_by(|a, b| b.hourly_yield.cmp(&a.hourly_yield));
        candidates
    }

    /// Purchase order if every purchase succeeds
    pub fn simulate(&self, balance: i64, catalog: &[UpgradeOption]) -> (Vec<i64>, Budget) {
        let mut budget = Budget::new(balance);
        let mut purchased = Vec::new();

        for option in self.candidates(balance, catalog) {
            if !budget.affords(option.cost) {
                continue;
            }
            budget.spend(option.cost);
            purchased.push(option.id);
        }

        (purchased, budget)
    }
}
