//! Cycle boundary commits
//!
//! At the first block of a cycle:
//!   - snapshot the active stake and derive rights one preserved window
//!     ahead, with per-baker and per-delegator rows for that future cycle
//!   - thaw the frozen amounts of the cycle leaving the preserved window
//!   - deactivate delegates that fell below the minimal stake

use crate::{
    account::store::AccountStore,
    base::{address::Address, amount::Amount, Level},
    cache::BlockContext,
    cycle::{store::CycleStore, BakerCycle, BakingRight, Cycle, DelegatorCycle},
    protocol::ProtocolParams,
};
use log::info;

/// First block of `cycle`. Returns the delegates deactivated here, which
/// the caller records on the block for the exact revert.
pub fn begin(
    ctx: &mut BlockContext,
    params: &ProtocolParams,
    cycle: u32,
    level: Level,
) -> anyhow::Result<Vec<Address>> {
    info!("cycle {cycle} begins at {level}");

    let snapshot = stake_snapshot(ctx, params)?;
    let total_staking = snapshot
        .iter()
        .fold(Amount::default(), |acc, (_, stake)| acc + *stake);
    ctx.update.cycles.push(Cycle {
        index: cycle,
        first_level: params.first_level_of_cycle(cycle),
        last_level: params.last_level_of_cycle(cycle),
        snapshot: snapshot.clone(),
        total_staking,
    });

    if !snapshot.is_empty() {
        plan_future_cycle(ctx, params, cycle + params.preserved_cycles, &snapshot)?;
    }
    thaw(ctx, params, cycle)?;
    deactivate_weak_delegates(ctx, params, level)
}

pub fn revert_begin(
    ctx: &mut BlockContext,
    params: &ProtocolParams,
    cycle: u32,
    deactivated: &[Address],
) -> anyhow::Result<()> {
    for addr in deactivated {
        ctx.update_account(addr, |a| {
            if let Some(info) = a.as_delegate_mut() {
                info.active = true;
                info.deactivation_level = None;
            }
        })?;
    }
    refreeze(ctx, params, cycle)?;

    let future = cycle + params.preserved_cycles;
    for right in ctx.store.get_baking_rights(future)? {
        ctx.update.deleted_baking_rights.push(right);
    }
    for row in ctx.store.get_baker_cycles(future)? {
        ctx.update
            .deleted_baker_cycles
            .push((row.cycle, row.baker));
    }
    for row in ctx.store.get_delegator_cycles(future)? {
        ctx.update
            .deleted_delegator_cycles
            .push((row.cycle, row.delegator));
    }
    ctx.update.deleted_cycles.push(cycle);
    Ok(())
}

/// Active delegates above the minimal stake, heaviest first
fn stake_snapshot(
    ctx: &mut BlockContext,
    params: &ProtocolParams,
) -> anyhow::Result<Vec<(Address, Amount)>> {
    let mut snapshot = vec![];
    for addr in ctx.store.get_delegates()? {
        let account = ctx.account(&addr)?;
        if let Some(info) = account.as_delegate() {
            if info.active && info.staking_balance >= params.minimal_stake {
                snapshot.push((addr, info.staking_balance));
            }
        }
    }
    snapshot.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(snapshot)
}

/// Deterministic round-robin over the snapshot: rights, baker rows and
/// delegator rows for the cycle one preserved window ahead
fn plan_future_cycle(
    ctx: &mut BlockContext,
    params: &ProtocolParams,
    future: u32,
    snapshot: &[(Address, Amount)],
) -> anyhow::Result<()> {
    let first = params.first_level_of_cycle(future);
    let last = params.last_level_of_cycle(future);
    let n = snapshot.len() as u32;

    for level in first..=last {
        let (baker, _) = &snapshot[((level - first) % n) as usize];
        ctx.update.baking_rights.push(BakingRight {
            cycle: future,
            level,
            round: 0,
            baker: baker.clone(),
        });
    }

    let expected_endorsements = params.endorsers_per_block * params.cycle_length / n;
    for (index, (baker, stake)) in snapshot.iter().enumerate() {
        let mut row = BakerCycle::new(future, baker.clone(), *stake);
        row.expected_blocks =
            params.cycle_length / n + u32::from((index as u32) < params.cycle_length % n);
        row.expected_endorsements = expected_endorsements;
        ctx.update.baker_cycles.push(row);

        for delegator in ctx.store.get_delegators(baker)? {
            let balance = ctx.account(&delegator)?.balance;
            ctx.update.delegator_cycles.push(DelegatorCycle {
                cycle: future,
                delegator,
                delegate: baker.clone(),
                balance,
            });
        }
    }
    Ok(())
}

/// Thaw the cycle leaving the preserved window. Deposits are a lock the
/// protocol holds outside the spendable balance, so releasing them only
/// clears the frozen bucket; earned fees and rewards enter the balance.
fn thaw(ctx: &mut BlockContext, params: &ProtocolParams, cycle: u32) -> anyhow::Result<()> {
    let Some(thawed) = cycle.checked_sub(params.preserved_cycles + 1) else {
        return Ok(());
    };
    for row in ctx.store.get_baker_cycles(thawed)? {
        if row.unfrozen {
            continue;
        }
        let earned = row.earned_total();
        ctx.update_account(&row.baker, |a| {
            if let Some(info) = a.as_delegate_mut() {
                info.frozen_deposits -= row.deposits;
                info.frozen_fees -= row.fees;
                info.frozen_rewards -= row.block_rewards + row.endorsement_rewards;
                info.staking_balance += earned;
            }
            a.balance += earned;
        })?;
        ctx.update_baker_cycle(row.cycle, &row.baker, |bc| bc.unfrozen = true)?;
    }
    Ok(())
}

fn refreeze(ctx: &mut BlockContext, params: &ProtocolParams, cycle: u32) -> anyhow::Result<()> {
    let Some(thawed) = cycle.checked_sub(params.preserved_cycles + 1) else {
        return Ok(());
    };
    for row in ctx.store.get_baker_cycles(thawed)? {
        if !row.unfrozen {
            continue;
        }
        let earned = row.earned_total();
        ctx.update_account(&row.baker, |a| {
            if let Some(info) = a.as_delegate_mut() {
                info.frozen_deposits += row.deposits;
                info.frozen_fees += row.fees;
                info.frozen_rewards += row.block_rewards + row.endorsement_rewards;
                info.staking_balance -= earned;
            }
            a.balance -= earned;
        })?;
        ctx.update_baker_cycle(row.cycle, &row.baker, |bc| bc.unfrozen = false)?;
    }
    Ok(())
}

/// Active delegates below the minimal stake deactivate at cycle begin
fn deactivate_weak_delegates(
    ctx: &mut BlockContext,
    params: &ProtocolParams,
    level: Level,
) -> anyhow::Result<Vec<Address>> {
    let mut deactivated = vec![];
    for addr in ctx.store.get_delegates()? {
        let account = ctx.account(&addr)?;
        let weak = account
            .as_delegate()
            .is_some_and(|info| info.active && info.staking_balance < params.minimal_stake);
        if weak {
            ctx.update_account(&addr, |a| {
                if let Some(info) = a.as_delegate_mut() {
                    info.active = false;
                    info.deactivation_level = Some(level);
                }
            })?;
            deactivated.push(addr);
        }
    }
    Ok(deactivated)
}
