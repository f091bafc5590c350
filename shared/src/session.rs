use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BoardError;

pub const DEFAULT_MAX_CHARGES: u32 = 64;
pub const DEFAULT_REGEN_INTERVAL_SECS: i64 = 30;

/// How fast paint charges come back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargePolicy {
    pub max_charges: u32,
    pub regen_interval: TimeDelta,
}

impl Default for ChargePolicy {
    fn default() -> Self {
        Self {
            max_charges: DEFAULT_MAX_CHARGES,
            regen_interval: TimeDelta::seconds(DEFAULT_REGEN_INTERVAL_SECS),
        }
    }
}

/// The session's paint balance: one unit per painted pixel, one unit
/// restored per whole regen interval, capped at the policy maximum.
/// Invariant: `charges <= max_charges`, never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionCharges {
    charges: u32,
    last_regen: DateTime<Utc>,
}

/// Read-only view of the session at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionStatus {
    Ready {
        charges: u32,
    },
    Cooling {
        next_charge_at: DateTime<Utc>,
        full_at: DateTime<Utc>,
    },
}

impl SessionCharges {
    /// A fresh session with a full balance.
    pub fn full(policy: ChargePolicy, now: DateTime<Utc>) -> Self {
        Self {
            charges: policy.max_charges,
            last_regen: now,
        }
    }

    /// Rebuild from persisted values, clamping into the policy's range.
    pub fn restore(charges: u32, last_regen: DateTime<Utc>, policy: ChargePolicy) -> Self {
        Self {
            charges: charges.min(policy.max_charges),
            last_regen,
        }
    }

    pub fn charges(&self) -> u32 {
        self.charges
    }

    pub fn last_regen(&self) -> DateTime<Utc> {
        self.last_regen
    }

    /// Apply every whole regen interval elapsed since `last_regen`. The
    /// timestamp advances by exactly the intervals applied, so fractional
    /// progress toward the next charge is never lost. At the cap the
    /// timestamp tracks `now` and no progress accrues.
    pub fn settle(&mut self, policy: ChargePolicy, now: DateTime<Utc>) {
        if now < self.last_regen {
            // Clock went backwards; restart the countdown rather than
            // waiting out a future timestamp.
            self.last_regen = now;
            return;
        }
        if self.charges >= policy.max_charges {
            self.charges = policy.max_charges;
            self.last_regen = now;
            return;
        }

        let interval_ms = policy.regen_interval.num_milliseconds().max(1);
        let whole = (now - self.last_regen).num_milliseconds() / interval_ms;
        if whole <= 0 {
            return;
        }

        let missing = i64::from(policy.max_charges - self.charges);
        if whole >= missing {
            self.charges = policy.max_charges;
            self.last_regen = now;
        } else {
            self.charges += whole as u32;
            self.last_regen += TimeDelta::milliseconds(whole * interval_ms);
        }
    }

    fn settled(&self, policy: ChargePolicy, now: DateTime<Utc>) -> Self {
        let mut copy = *self;
        copy.settle(policy, now);
        copy
    }

    /// Charges available at `now`. Does not mutate.
    pub fn available(&self, policy: ChargePolicy, now: DateTime<Utc>) -> u32 {
        self.settled(policy, now).charges
    }

    /// Ready/Cooling view at `now`. Does not mutate; repeated reads within
    /// the same tick observe the same answer.
    pub fn status(&self, policy: ChargePolicy, now: DateTime<Utc>) -> SessionStatus {
        let settled = self.settled(policy, now);
        if settled.charges > 0 {
            SessionStatus::Ready {
                charges: settled.charges,
            }
        } else {
            SessionStatus::Cooling {
                next_charge_at: settled.last_regen + policy.regen_interval,
                full_at: settled.last_regen
                    + policy.regen_interval * policy.max_charges as i32,
            }
        }
    }

    /// Consume one charge. At zero balance the attempt is rejected with
    /// `RateLimited` and nothing mutates beyond settling.
    pub fn spend(&mut self, policy: ChargePolicy, now: DateTime<Utc>) -> Result<u32, BoardError> {
        self.settle(policy, now);
        if self.charges == 0 {
            let wait_ms = (self.last_regen + policy.regen_interval - now)
                .num_milliseconds()
                .max(0);
            return Err(BoardError::RateLimited {
                retry_after_secs: (wait_ms as u64).div_ceil(1000),
            });
        }
        self.charges -= 1;
        Ok(self.charges)
    }

    /// Paid bypass: restore the full balance immediately, regardless of
    /// elapsed time.
    pub fn restore_full(&mut self, policy: ChargePolicy, now: DateTime<Utc>) {
        self.charges = policy.max_charges;
        self.last_regen = now;
    }
}
