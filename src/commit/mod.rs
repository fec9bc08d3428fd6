//! Apply/revert commits
//!
//! One module per operation family. Every apply has an exact-inverse revert
//! driven by what the apply recorded in the operation payload, so reverting
//! a block restores byte-identical entity state.

pub mod anomaly;
pub mod bigmap;
pub mod block;
pub mod consensus;
pub mod cycles;
pub mod governance;
pub mod manager;
pub mod rollup;
pub mod tickets;

use crate::{
    account::Account,
    base::{address::Address, op_hash::OpHash},
    block::Block,
    cache::BlockContext,
    error::IndexerError,
    operation::{
        parse::ManagerContent, ManagerInfo, Operation, OperationKind, OperationPayload,
        OperationStatus,
    },
};

/// Allocate an id and push the durable operation record
#[allow(clippy::too_many_arguments)]
pub(crate) fn push_operation(
    ctx: &mut BlockContext,
    block: &Block,
    hash: &OpHash,
    kind: OperationKind,
    sender: Address,
    target: Option<Address>,
    initiator: Option<Address>,
    status: OperationStatus,
    payload: OperationPayload,
) -> u64 {
    let id = ctx.state.next_operation_id();
    let prev_levels = ctx.take_activity();
    ctx.update.operations.push(Operation {
        id,
        level: block.level,
        timestamp: block.timestamp,
        hash: hash.clone(),
        kind,
        sender,
        target,
        initiator,
        status,
        prev_levels,
        payload,
    });
    id
}

/// Undo [push_operation]: drop the record and release its id.
/// Callers run in descending id order, so releases are LIFO and the
/// allocator lands back on its pre-block value.
pub(crate) fn pop_operation(ctx: &mut BlockContext, op: &Operation) {
    ctx.update.deleted_operations.push((op.level, op.id));
    ctx.state.release_operation_id();
}

/// Count one more operation of `kind` against an existing account.
/// The account's last-activity level from before the operation is noted
/// for the record pushed next, so the revert can restore it.
pub(crate) fn track(
    ctx: &mut BlockContext,
    addr: &Address,
    kind: OperationKind,
    level: crate::base::Level,
) -> anyhow::Result<()> {
    let mut account = ctx.account(addr)?;
    ctx.note_activity(addr, account.last_level);
    account.add_op(kind, level);
    ctx.put_account(account);
    Ok(())
}

/// Uncount one operation of `kind`, restoring the last-activity level the
/// operation recorded and erasing the account if this was the last thing
/// referencing it.
pub(crate) fn untrack(
    ctx: &mut BlockContext,
    addr: &Address,
    kind: OperationKind,
    op: &Operation,
) -> anyhow::Result<()> {
    let mut account = ctx.account(addr)?;
    account.remove_op(kind);
    if let Some(prev) = op.prev_level_of(addr) {
        account.last_level = prev;
    }
    let erasable = account.is_erasable();
    ctx.put_account(account);
    if erasable {
        ctx.remove_account(addr);
    }
    Ok(())
}

///////////////////////
// manager fee flow  //
///////////////////////

/// Fee and counter flow shared by every manager operation, paid even when
/// the operation itself failed: sender pays the fee, the sender's delegate
/// loses that much staking balance, the block baker freezes it.
pub(crate) fn apply_manager_shell(
    ctx: &mut BlockContext,
    block: &Block,
    content: &ManagerContent,
) -> anyhow::Result<ManagerInfo> {
    let mut sender = ctx.account(&content.source)?;
    if sender.balance < content.fee {
        return Err(IndexerError::invariant(format!(
            "{} cannot pay fee {}",
            sender.address, content.fee
        )));
    }
    let prev_counter = sender.counter;
    sender.counter = content.counter;
    sender.balance -= content.fee;
    let delegate = sender.delegate.clone();
    ctx.put_account(sender);

    if let Some(delegate) = &delegate {
        ctx.update_account(delegate, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance -= content.fee;
            }
        })?;
    }
    ctx.update_account(&block.baker, |b| {
        if let Some(info) = b.as_delegate_mut() {
            info.frozen_fees += content.fee;
        }
    })?;
    ctx.update_baker_cycle(block.cycle, &block.baker, |bc| {
        bc.fees += content.fee;
    })?;

    Ok(ManagerInfo {
        fee: content.fee,
        counter: content.counter,
        gas_limit: content.gas_limit,
        storage_limit: content.storage_limit,
        prev_counter,
    })
}

/// Exact inverse of [apply_manager_shell]
pub(crate) fn revert_manager_shell(
    ctx: &mut BlockContext,
    block: &Block,
    sender: &Address,
    manager: &ManagerInfo,
) -> anyhow::Result<()> {
    let mut account = ctx.account(sender)?;
    account.counter = manager.prev_counter;
    account.balance += manager.fee;
    let delegate = account.delegate.clone();
    ctx.put_account(account);

    if let Some(delegate) = &delegate {
        ctx.update_account(delegate, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance += manager.fee;
            }
        })?;
    }
    ctx.update_account(&block.baker, |b| {
        if let Some(info) = b.as_delegate_mut() {
            info.frozen_fees -= manager.fee;
        }
    })?;
    ctx.update_baker_cycle(block.cycle, &block.baker, |bc| {
        bc.fees -= manager.fee;
    })?;
    Ok(())
}

/// Move `amount` between two balances, keeping the delegates' staking
/// balances in step. A no-op amount short-circuits.
pub(crate) fn move_balance(
    ctx: &mut BlockContext,
    from: &Address,
    to: &Address,
    amount: crate::base::amount::Amount,
) -> anyhow::Result<()> {
    if amount.is_zero() {
        return Ok(());
    }
    let mut sender = ctx.account(from)?;
    if sender.balance < amount {
        return Err(IndexerError::invariant(format!(
            "{from} cannot move {amount}"
        )));
    }
    sender.balance -= amount;
    let sender_delegate = sender.delegate.clone();
    let sender_is_delegate = sender.is_delegate();
    ctx.put_account(sender);

    let mut receiver = ctx.account(to)?;
    receiver.balance += amount;
    let receiver_delegate = receiver.delegate.clone();
    let receiver_is_delegate = receiver.is_delegate();
    ctx.put_account(receiver);

    // a delegate's own balance counts toward its staking balance
    let sender_stake_holder = if sender_is_delegate {
        Some(from.clone())
    } else {
        sender_delegate
    };
    let receiver_stake_holder = if receiver_is_delegate {
        Some(to.clone())
    } else {
        receiver_delegate
    };
    if let Some(holder) = sender_stake_holder {
        ctx.update_account(&holder, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance -= amount;
            }
        })?;
    }
    if let Some(holder) = receiver_stake_holder {
        ctx.update_account(&holder, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance += amount;
            }
        })?;
    }
    Ok(())
}

/// Partition an account's staking contribution for delegation moves
pub(crate) fn stake_holder(account: &Account) -> Option<Address> {
    if account.is_delegate() {
        Some(account.address.clone())
    } else {
        account.delegate.clone()
    }
}
