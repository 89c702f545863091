//! Emergency-withdrawal penalty arithmetic.
//!
//! All math runs in `u128`. A non-zero rate on a non-zero balance with
//! time left on the lock always costs at least one unit: the penalty
//! rounds up, then is clamped to the balance. The owner's share plus the
//! penalty always sums back to the balance.

use piggy_protocol::config::{PenaltyModel, BPS_DENOMINATOR};

/// `ceil(numerator / denominator)`. `denominator` must be non-zero.
fn div_ceil(numerator: u128, denominator: u128) -> u128 {
    numerator / denominator + u128::from(numerator % denominator != 0)
}

/// Penalty owed on `balance` for an early exit with `remaining_secs` left
/// on a lock of `lock_secs`.
pub fn compute_penalty(
    model: &PenaltyModel,
    balance: u64,
    lock_secs: u64,
    remaining_secs: u64,
) -> u64 {
    let penalty = match *model {
        PenaltyModel::Fixed { bps } => div_ceil(
            u128::from(balance) * u128::from(bps),
            u128::from(BPS_DENOMINATOR),
        ),
        PenaltyModel::Linear { max_bps } => {
            if lock_secs == 0 {
                return 0;
            }
            let scaled = u128::from(balance) * u128::from(max_bps);
            let mut remaining = u128::from(remaining_secs.min(lock_secs));
            let mut lock = u128::from(lock_secs);
            // Locks near u64::MAX seconds: drop low bits of the time ratio
            // until the product fits. `lock >= remaining` keeps it non-zero.
            while scaled.checked_mul(remaining).is_none() {
                remaining >>= 1;
                lock >>= 1;
            }
            div_ceil(scaled * remaining, u128::from(BPS_DENOMINATOR) * lock)
        }
    };
    // Unvalidated models can exceed 100%.
    u64::try_from(penalty).unwrap_or(u64::MAX).min(balance)
}

/// Splits `balance` into `(to_owner, penalty)`.
pub fn split_balance(
    model: &PenaltyModel,
    balance: u64,
    lock_secs: u64,
    remaining_secs: u64,
) -> (u64, u64) {
    let penalty = compute_penalty(model, balance, lock_secs, remaining_secs);
    (balance - penalty, penalty)
}
