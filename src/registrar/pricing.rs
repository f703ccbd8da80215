//! Tiered pricing for candidate names.
//!
//! The tier table is a declared constant keyed by exact name length. It is
//! deliberately non-monotonic: three-character names cost more than two- and
//! four-character ones. Callers must not assume price decreases with length.

use serde::{Deserialize, Serialize};
use solana_sdk::native_token::sol_to_lamports;

/// Flat network fee added to every registration, in SOL.
pub const NETWORK_FEE_SOL: f64 = 0.001;

/// Computed price for registering a given name at the time of the check.
/// Recomputed on every call, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Length-tier base price, in SOL
    pub base_sol: f64,
    /// Flat network fee, in SOL
    pub network_fee_sol: f64,
    /// base + fee, in SOL
    pub total_sol: f64,
}

impl PriceQuote {
    /// The total as an integral lamport amount for the transfer payload.
    pub fn total_lamports(&self) -> u64 {
        sol_to_lamports(self.total_sol)
    }
}

/// Quote the registration price for a name by its exact length.
pub fn quote(name: &str) -> PriceQuote {
    let base_sol = match name.chars().count() {
        1 | 2 => 0.05,
        3 => 0.1,
        4 => 0.05,
        _ => 0.02,
    };
    PriceQuote {
        base_sol,
        network_fee_sol: NETWORK_FEE_SOL,
        total_sol: base_sol + NETWORK_FEE_SOL,
    }
}
