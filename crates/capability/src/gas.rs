//! Gas accounting for syscalls.
//!
//! The provider charges the base cost on entry and per-byte costs before an
//! operation takes effect, so a syscall that fails its checks consumes base
//! gas only and leaves no state behind. All arithmetic is checked: an
//! overflowing charge is treated as exceeding the budget rather than
//! wrapping.

use opal_types::error::CapError;

/// A per-transaction gas meter.
#[derive(Debug, Clone, Copy)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Creates a meter with the transaction's gas limit.
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charges `amount` units, failing with `LimitExceeded` when the budget
    /// is exhausted.
    pub fn charge(&mut self, amount: u64) -> Result<(), CapError> {
        let next = self.used.checked_add(amount).ok_or(CapError::LimitExceeded)?;
        if next > self.limit {
            return Err(CapError::LimitExceeded);
        }
        self.used = next;
        Ok(())
    }

    /// Charges `per_unit * count`, guarding the multiplication.
    pub fn charge_per_byte(&mut self, per_unit: u64, count: u64) -> Result<(), CapError> {
        let amount = per_unit.checked_mul(count).ok_or(CapError::LimitExceeded)?;
        self.charge(amount)
    }

    /// Gas consumed so far.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Gas still available.
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}
