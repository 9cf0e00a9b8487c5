//! Request budget rationing against the remote API's daily ceiling.
//!
//! A fresh [`QuotaTracker`] is built for every job invocation. The remote
//! `/status` endpoint is the source of truth for what has been used today;
//! the tracker layers a safety margin (headroom for other jobs sharing the
//! same key) and a per-run ceiling on top of it.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};

use super::{http::SportsApi, types::ApiStatus};
use crate::error::Result;

/// Calls left untouched so concurrent jobs on the same key are not starved.
pub const DEFAULT_SAFETY_MARGIN: u32 = 50;

/// Minimum spacing between remote calls (provider allows ~300/min).
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    pub safety_margin: u32,
    pub min_delay: Duration,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            safety_margin: DEFAULT_SAFETY_MARGIN,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub remaining: u32,
}

#[derive(Debug)]
pub struct QuotaTracker {
    policy: QuotaPolicy,
    run_budget: u32,
    remote: Option<ApiStatus>,
    spent: u32,
    last_call: Option<Instant>,
}

impl QuotaTracker {
    /// `run_budget` caps the calls this invocation may issue regardless of
    /// what the remote still allows.
    pub fn new(policy: QuotaPolicy, run_budget: u32) -> Self {
        Self {
            policy,
            run_budget,
            remote: None,
            spent: 0,
            last_call: None,
        }
    }

    /// Query the remote usage endpoint once. Errors are returned as-is so
    /// the caller aborts the run instead of guessing.
    pub async fn check_availability<A: SportsApi>(&mut self, api: &A) -> Result<Availability> {
        let status = api.status().await?;
        tracing::info!(
            used = status.used,
            limit = status.limit,
            margin = self.policy.safety_margin,
            budget = self.run_budget,
            "Remote quota status"
        );
        self.remote = Some(status);
        Ok(self.availability())
    }

    pub fn availability(&self) -> Availability {
        let remaining = self.remaining();
        Availability {
            available: remaining > 0,
            remaining,
        }
    }

    /// Calls this run may still issue. Zero until the status was checked.
    pub fn remaining(&self) -> u32 {
        let Some(status) = self.remote else {
            return 0;
        };
        let daily = status
            .remaining()
            .saturating_sub(self.policy.safety_margin)
            .saturating_sub(self.spent);
        let run = self.run_budget.saturating_sub(self.spent);
        daily.min(run)
    }

    pub fn can_spend(&self, n: u32) -> bool {
        n <= self.remaining()
    }

    /// Account for one remote call about to be issued, waiting out the
    /// minimum spacing since the previous call first. Every issued call is
    /// counted, whether or not it succeeds.
    pub async fn spend(&mut self) {
        if let Some(last) = self.last_call {
            let ready_at = last + self.policy.min_delay;
            let now = Instant::now();
            if ready_at > now {
                sleep(ready_at - now).await;
            }
        }
        self.last_call = Some(Instant::now());
        self.spent += 1;
    }

    pub fn spent(&self) -> u32 {
        self.spent
    }

    pub fn remote_status(&self) -> Option<ApiStatus> {
        self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(used: u32, limit: u32, margin: u32, budget: u32) -> QuotaTracker {
        let mut q = QuotaTracker::new(
            QuotaPolicy {
                safety_margin: margin,
                min_delay: Duration::ZERO,
            },
            budget,
        );
        q.remote = Some(ApiStatus { used, limit });
        q
    }

    #[test]
    fn test_nothing_available_before_status_check() {
        let q = QuotaTracker::new(QuotaPolicy::default(), 100);
        assert_eq!(q.remaining(), 0);
        assert!(!q.can_spend(1));
        assert!(!q.availability().available);
    }

    #[test]
    fn test_safety_margin_is_reserved() {
        let q = checked(0, 100, 10, 1000);
        assert_eq!(q.remaining(), 90);
        assert!(q.can_spend(90));
        assert!(!q.can_spend(91));
    }

    #[test]
    fn test_run_budget_caps_remaining() {
        let q = checked(0, 7500, 50, 20);
        assert_eq!(q.remaining(), 20);
    }

    #[test]
    fn test_exhausted_remote_quota() {
        let q = checked(95, 100, 10, 50);
        assert_eq!(q.remaining(), 0);
        assert_eq!(
            q.availability(),
            Availability {
                available: false,
                remaining: 0
            }
        );
    }

    #[tokio::test]
    async fn test_spend_decrements_remaining() {
        let mut q = checked(0, 100, 0, 3);
        assert!(q.can_spend(3));
        q.spend().await;
        q.spend().await;
        assert_eq!(q.spent(), 2);
        assert!(q.can_spend(1));
        assert!(!q.can_spend(2));
        q.spend().await;
        assert!(!q.can_spend(1));
    }

    #[tokio::test]
    async fn test_spend_enforces_min_delay() {
        let mut q = QuotaTracker::new(
            QuotaPolicy {
                safety_margin: 0,
                min_delay: Duration::from_millis(40),
            },
            10,
        );
        q.remote = Some(ApiStatus { used: 0, limit: 100 });

        let start = std::time::Instant::now();
        q.spend().await; // first call is not delayed
        q.spend().await;
        q.spend().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
