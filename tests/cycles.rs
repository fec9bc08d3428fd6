//! Cycle boundary commits: thawing frozen amounts and planning rights

use dpos_indexer::{
    account::{store::AccountStore, Account, AccountDetails, DelegateInfo},
    base::{address::Address, amount::Amount},
    cache::BlockContext,
    commit::cycles,
    cycle::{store::CycleStore, BakerCycle},
    protocol::ProtocolParams,
    store::IndexerStore,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const DELEGATE: &str = "tz1gg5bjopPcr9agjamyu9BbXKLibNc2rbAq";

fn delegate_account(addr: &Address, info: DelegateInfo) -> Account {
    Account {
        details: AccountDetails::Delegate(info),
        ..Account::new_user(addr.clone(), 1)
    }
}

#[test]
fn thaw_releases_deposits_but_credits_only_earnings() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("thaw")?;
    let store = IndexerStore::new(tmp.path())?;
    let params = ProtocolParams::for_version(1);
    let addr = Address::new(DELEGATE);

    let deposits = Amount::new(1_280);
    let fees = Amount(2_500);
    let block_rewards = Amount::new(20);
    let endorsement_rewards = Amount(1_250_000);
    let earned = fees + block_rewards + endorsement_rewards;

    let mut ctx = BlockContext::new(&store)?;
    ctx.put_account(delegate_account(
        &addr,
        DelegateInfo {
            frozen_deposits: deposits,
            frozen_fees: fees,
            frozen_rewards: block_rewards + endorsement_rewards,
            active: true,
            activation_level: 1,
            ..DelegateInfo::default()
        },
    ));
    let mut row = BakerCycle::new(0, addr.clone(), Amount::default());
    row.blocks = 2;
    row.deposits = deposits;
    row.fees = fees;
    row.block_rewards = block_rewards;
    row.endorsement_rewards = endorsement_rewards;
    ctx.update.baker_cycles.push(row);
    store.commit_update(ctx.into_update())?;
    let frozen_state = store.get_account(&addr)?.expect("delegate");

    // cycle 0 leaves the preserved window when cycle 6 begins
    let mut ctx = BlockContext::new(&store)?;
    cycles::begin(&mut ctx, &params, 6, params.first_level_of_cycle(6))?;
    store.commit_update(ctx.into_update())?;

    let thawed = store.get_account(&addr)?.expect("delegate");
    let info = thawed.as_delegate().expect("delegate info");
    assert_eq!(Amount::default(), info.frozen_deposits);
    assert_eq!(Amount::default(), info.frozen_fees);
    assert_eq!(Amount::default(), info.frozen_rewards);
    // the deposit lock expires without touching the balance
    assert_eq!(earned, thawed.balance);
    assert_eq!(earned, info.staking_balance);
    assert!(store.get_baker_cycle(0, &addr)?.expect("baker cycle").unfrozen);

    // reverting the boundary refreezes exactly what thawed
    let mut ctx = BlockContext::new(&store)?;
    cycles::revert_begin(&mut ctx, &params, 6, &[])?;
    store.commit_update(ctx.into_update())?;

    assert_eq!(frozen_state, store.get_account(&addr)?.expect("delegate"));
    assert!(!store.get_baker_cycle(0, &addr)?.expect("baker cycle").unfrozen);
    assert!(store.get_cycle(6)?.is_none());
    Ok(())
}

#[test]
fn snapshot_plans_rights_one_window_ahead() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("rights")?;
    let store = IndexerStore::new(tmp.path())?;
    let params = ProtocolParams {
        cycle_length: 8,
        ..ProtocolParams::for_version(1)
    };
    let addr = Address::new(DELEGATE);
    let stake = Amount::new(7_000);

    let mut ctx = BlockContext::new(&store)?;
    let mut account = delegate_account(
        &addr,
        DelegateInfo {
            staking_balance: stake,
            active: true,
            activation_level: 1,
            ..DelegateInfo::default()
        },
    );
    account.balance = stake;
    ctx.put_account(account);
    ctx.update.delegates_added.push(addr.clone());
    store.commit_update(ctx.into_update())?;

    let mut ctx = BlockContext::new(&store)?;
    let deactivated = cycles::begin(&mut ctx, &params, 1, params.first_level_of_cycle(1))?;
    assert!(deactivated.is_empty());
    store.commit_update(ctx.into_update())?;

    let cycle = store.get_cycle(1)?.expect("cycle row");
    assert_eq!(vec![(addr.clone(), stake)], cycle.snapshot);
    assert_eq!(stake, cycle.total_staking);

    // a single delegate takes every slot of the future cycle
    let future = 1 + params.preserved_cycles;
    let first = params.first_level_of_cycle(future);
    assert_eq!(Some(addr.clone()), store.get_baking_right(future, first, 0)?);
    assert_eq!(
        Some(addr.clone()),
        store.get_baking_right(future, params.last_level_of_cycle(future), 0)?
    );

    let planned = store.get_baker_cycle(future, &addr)?.expect("planned row");
    assert_eq!(stake, planned.stake);
    assert_eq!(params.cycle_length, planned.expected_blocks);
    assert_eq!(
        params.endorsers_per_block * params.cycle_length,
        planned.expected_endorsements
    );
    Ok(())
}
