use tracing::debug;

use crate::U256;
use crate::compact::{self, ExpandedBits};
use crate::error::{KingError, Result};
use crate::params::{ChainParams, RetargetRegime};
use crate::sha256::Hash;
use crate::types::{BlockHeader, BlockIndex};

/// Heights at which retargeting switches regime, keyed by the height
/// of the block being considered. Consensus constants: every node must
/// place the era boundaries identically or the chain splits.
const ERA_SCHEDULE: [(u64, usize); 3] = [(100, 0), (200, 1), (u64::MAX, 2)];

fn regime_for(params: &ChainParams, next_height: u64) -> RetargetRegime {
    for &(end, regime) in ERA_SCHEDULE.iter() {
        if next_height < end {
            return params.regimes()[regime];
        }
    }
    params.regimes()[2]
}

/// Target ("bits") the block following `tip` must meet. Pure over the
/// ancestor chain and the parameter set; the same inputs always give
/// the same answer.
pub fn next_work_required(
    tip: Option<&BlockIndex>,
    header: &BlockHeader,
    params: &ChainParams,
) -> u32 {
    let Some(tip) = tip else {
        // Genesis block.
        return params.pow_limit_bits();
    };
    let regime = regime_for(params, tip.height + 1);
    retarget(tip, header, params, &regime)
}

/// One retargeting step. The same algorithm runs in every era; only
/// the timespan/spacing constants differ.
fn retarget(
    tip: &BlockIndex,
    header: &BlockHeader,
    params: &ChainParams,
    regime: &RetargetRegime,
) -> u32 {
    let limit_bits = params.pow_limit_bits();
    let interval = regime.interval();

    // Only change once per interval.
    if (tip.height + 1) % interval != 0 {
        if params.allow_min_difficulty_blocks() {
            // Special rule for sparse networks: once no block has
            // arrived for twice the target spacing, a min-difficulty
            // block is allowed so the chain keeps moving.
            if header.block_time() > tip.block_time() + 2 * regime.target_spacing as i64 {
                return limit_bits;
            }
            // Return the last target that was not set by the
            // min-difficulty rule.
            let mut index = tip;
            while let Some(prev) = index.prev.as_deref() {
                if index.height % interval == 0 || index.bits != limit_bits {
                    break;
                }
                index = prev;
            }
            return index.bits;
        }
        return tip.bits;
    }

    // Go back one full window, except at the very first retarget after
    // genesis where the window is one block short. Walking back the
    // full interval there would let a majority miner bias the first
    // adjustment at will.
    let blocks_to_go_back = if tip.height + 1 == interval {
        interval - 1
    } else {
        interval
    };
    let mut reference = tip;
    for _ in 0..blocks_to_go_back {
        reference = reference
            .prev
            .as_deref()
            .expect("BUG: chain shorter than its retarget window");
    }

    // Elapsed time is measured across the window ending at the tip,
    // not at the candidate block.
    let mut actual_timespan = tip.block_time() - reference.block_time();
    debug!("actual timespan {actual_timespan}s before bounds");
    let target_timespan = regime.target_timespan as i64;
    actual_timespan = actual_timespan.clamp(target_timespan / 4, target_timespan * 4);

    let expanded = compact::expand(tip.bits);
    let mut new_target = expanded.target;
    // The intermediate product can overflow a 256-bit value by one
    // bit; pre-shift and compensate after the division. Anything the
    // pre-shift cannot absorb wraps at 256 bits, the same fixed-width
    // arithmetic every node runs.
    let shift = new_target.bits() > 235;
    if shift {
        new_target = new_target >> 1;
    }
    (new_target, _) = new_target.overflowing_mul(U256::from(actual_timespan as u64));
    new_target = new_target / U256::from(target_timespan as u64);
    if shift {
        new_target = new_target << 1;
    }

    if new_target > params.pow_limit() {
        new_target = params.pow_limit();
    }

    let new_bits = compact::compress(new_target);
    debug!(
        "retarget: target timespan {target_timespan}s actual {actual_timespan}s before {:08x} after {new_bits:08x}",
        tip.bits
    );
    new_bits
}

/// Checks that `hash` satisfies the work claimed by `bits` under the
/// given rules.
pub fn check_proof_of_work(hash: Hash, bits: u32, params: &ChainParams) -> Result<()> {
    if params.skip_proof_of_work_check() {
        return Ok(());
    }

    let ExpandedBits {
        target,
        negative,
        overflow,
    } = compact::expand(bits);

    if negative || target.is_zero() || overflow || target > params.pow_limit() {
        return Err(KingError::BitsBelowMinimumWork);
    }
    if !hash.matches_target(target) {
        return Err(KingError::HashAboveTarget);
    }
    Ok(())
}

/// Work contributed by a block mined at `bits`: 2^256 / (target + 1),
/// computed without materializing 2^256. Since 2^256 is at least as
/// large as target + 1, the quotient equals
/// (2^256 - target - 1) / (target + 1) + 1, or !target / (target + 1) + 1.
/// A malformed target contributes no work.
pub fn block_proof(bits: u32) -> U256 {
    let ExpandedBits {
        target,
        negative,
        overflow,
    } = compact::expand(bits);
    if negative || overflow || target.is_zero() {
        return U256::zero();
    }
    !target / (target + U256::one()) + U256::one()
}
