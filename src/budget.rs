// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Daily Budget Reset
//!
//! Background task that restores every student's daily transaction budget
//! to the configured limit once per interval (default 24 h).
//!
//! The first reset happens one full interval after startup, so restarting
//! the server does not hand out fresh budgets.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::storage::LedgerStore;

/// Default interval between resets.
pub const DEFAULT_RESET_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct BudgetResetter {
    ledger: Arc<dyn LedgerStore>,
    daily_limit: u32,
    interval: Duration,
}

impl BudgetResetter {
    pub fn new(ledger: Arc<dyn LedgerStore>, daily_limit: u32) -> Self {
        Self {
            ledger,
            daily_limit,
            interval: DEFAULT_RESET_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(resetter.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            daily_limit = self.daily_limit,
            "Budget reset task starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Budget reset task shutting down");
                    return;
                }
            }

            self.reset_step();
        }
    }

    fn reset_step(&self) {
        match self.ledger.reset_daily_limits(self.daily_limit) {
            Ok(count) => info!(accounts = count, limit = self.daily_limit, "Daily budgets reset"),
            Err(e) => warn!(error = %e, "Daily budget reset failed"),
        }
    }
}
