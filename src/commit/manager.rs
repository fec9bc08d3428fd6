//! Manager operation commits: reveals, delegations, originations,
//! transactions, ticket transfers, and the internal operation trees they
//! emit
//!
//! The fee/counter shell applies even to failed operations; content
//! effects, internal operations and attached diffs only apply when the
//! node reported the operation applied.

use super::{
    apply_manager_shell, bigmap, move_balance, pop_operation, push_operation,
    revert_manager_shell, rollup, stake_holder, tickets, track, untrack,
};
use crate::{
    account::{Account, AccountDetails, DelegateInfo},
    base::{address::Address, amount::Amount, op_hash::OpHash},
    block::Block,
    cache::BlockContext,
    error::IndexerError,
    operation::{
        parse::{InternalBody, InternalContent, ManagerBody, ManagerContent},
        ManagerInfo, Operation, OperationKind, OperationPayload, OperationStatus,
    },
    protocol::ProtocolParams,
};

pub fn apply_manager(
    ctx: &mut BlockContext,
    block: &Block,
    params: &ProtocolParams,
    hash: &OpHash,
    content: &ManagerContent,
) -> anyhow::Result<()> {
    let manager = apply_manager_shell(ctx, block, content)?;
    let kind = content.body.kind();
    track(ctx, &content.source, kind, block.level)?;

    if !content.status.is_applied() {
        let payload = failed_payload(content, manager);
        push_operation(
            ctx,
            block,
            hash,
            kind,
            content.source.clone(),
            content.body.target().cloned(),
            None,
            OperationStatus::Failed,
            payload,
        );
        return Ok(());
    }

    match &content.body {
        ManagerBody::Reveal { public_key } => {
            let mut sender = ctx.account(&content.source)?;
            let prev_public_key = sender.revealed_key.clone();
            sender.revealed_key = Some(public_key.clone());
            ctx.put_account(sender);

            push_operation(
                ctx,
                block,
                hash,
                kind,
                content.source.clone(),
                None,
                None,
                OperationStatus::Applied,
                OperationPayload::Reveal {
                    manager,
                    public_key: public_key.clone(),
                    prev_public_key,
                },
            );
        }
        ManagerBody::Delegation { delegate } => {
            let effects = apply_delegation_effects(ctx, block, &content.source, delegate.as_ref())?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                content.source.clone(),
                delegate.clone(),
                None,
                OperationStatus::Applied,
                OperationPayload::Delegation {
                    manager: Some(manager),
                    new_delegate: effects.new_delegate,
                    prev_delegate: effects.prev_delegate,
                    moved: effects.moved,
                    registered: effects.registered,
                },
            );
        }
        ManagerBody::Origination { balance, contract } => {
            apply_origination_effects(ctx, block, &content.source, contract, *balance)?;
            bigmap::apply_diffs(ctx, block.level, Some(contract), &content.bigmap_diffs)?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                content.source.clone(),
                Some(contract.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::Origination {
                    manager: Some(manager),
                    contract: contract.clone(),
                    contract_balance: *balance,
                },
            );
        }
        ManagerBody::Transaction {
            amount,
            destination,
            entrypoint,
        } => {
            ctx.account_or_create(destination, block.level)?;
            move_balance(ctx, &content.source, destination, *amount)?;
            track(ctx, destination, kind, block.level)?;
            bigmap::apply_diffs(
                ctx,
                block.level,
                destination.is_contract().then_some(destination),
                &content.bigmap_diffs,
            )?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                content.source.clone(),
                Some(destination.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::Transaction {
                    manager: Some(manager),
                    amount: *amount,
                    entrypoint: entrypoint.clone(),
                },
            );
        }
        ManagerBody::TransferTicket { destination } => {
            ctx.account_or_create(destination, block.level)?;
            track(ctx, destination, kind, block.level)?;
            let transfers = tickets::apply_updates(ctx, block.level, &content.ticket_updates)?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                content.source.clone(),
                Some(destination.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::TransferTicket { manager, transfers },
            );
        }
        body => rollup::apply_rollup(ctx, block, params, hash, content, body, manager)?,
    }

    for internal in &content.internals {
        apply_internal(ctx, block, hash, &content.source, internal)?;
    }
    Ok(())
}

/// Payload for a failed operation: attempted values recorded, no effects
fn failed_payload(content: &ManagerContent, manager: ManagerInfo) -> OperationPayload {
    match &content.body {
        ManagerBody::Reveal { public_key } => OperationPayload::Reveal {
            manager,
            public_key: public_key.clone(),
            prev_public_key: None,
        },
        ManagerBody::Delegation { delegate } => OperationPayload::Delegation {
            manager: Some(manager),
            new_delegate: delegate.clone(),
            prev_delegate: None,
            moved: Amount::default(),
            registered: false,
        },
        ManagerBody::Origination { balance, contract } => OperationPayload::Origination {
            manager: Some(manager),
            contract: contract.clone(),
            contract_balance: *balance,
        },
        ManagerBody::Transaction {
            amount, entrypoint, ..
        } => OperationPayload::Transaction {
            manager: Some(manager),
            amount: *amount,
            entrypoint: entrypoint.clone(),
        },
        ManagerBody::TransferTicket { .. } => OperationPayload::TransferTicket {
            manager,
            transfers: 0,
        },
        body => rollup::failed_payload(body, manager),
    }
}

//////////////////
// delegations  //
//////////////////

pub(crate) struct DelegationEffects {
    pub new_delegate: Option<Address>,
    pub prev_delegate: Option<Address>,
    pub moved: Amount,
    pub registered: bool,
}

/// Shared by external and internal delegations
pub(crate) fn apply_delegation_effects(
    ctx: &mut BlockContext,
    block: &Block,
    source: &Address,
    delegate: Option<&Address>,
) -> anyhow::Result<DelegationEffects> {
    let sender = ctx.account(source)?;
    let prev_delegate = sender.delegate.clone();
    let moved = sender.balance;
    let self_delegation = delegate == Some(source);
    let registered = self_delegation && !sender.is_delegate();

    // leave the previous delegate
    if let Some(prev) = &prev_delegate {
        ctx.update_account(prev, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance -= moved;
                info.delegators_count -= 1;
            }
        })?;
        ctx.update
            .delegators_removed
            .push((prev.clone(), source.clone()));
    }

    if registered {
        let mut sender = ctx.account(source)?;
        sender.delegate = None;
        sender.details = AccountDetails::Delegate(DelegateInfo {
            staking_balance: moved,
            active: true,
            activation_level: block.level,
            ..DelegateInfo::default()
        });
        ctx.put_account(sender);
        ctx.update.delegates_added.push(source.clone());
    } else if self_delegation {
        // already a delegate, nothing to move
    } else if let Some(new) = delegate {
        let mut target = ctx.account(new)?;
        let Some(info) = target.as_delegate_mut() else {
            return Err(IndexerError::referential(format!(
                "delegation to non-delegate {new}"
            )));
        };
        info.staking_balance += moved;
        info.delegators_count += 1;
        ctx.put_account(target);
        ctx.update
            .delegators_added
            .push((new.clone(), source.clone()));
        ctx.update_account(source, |a| a.delegate = Some(new.clone()))?;
    } else {
        ctx.update_account(source, |a| a.delegate = None)?;
    }

    Ok(DelegationEffects {
        new_delegate: delegate.cloned(),
        prev_delegate,
        moved,
        registered,
    })
}

pub(crate) fn revert_delegation_effects(
    ctx: &mut BlockContext,
    source: &Address,
    new_delegate: Option<&Address>,
    prev_delegate: Option<&Address>,
    moved: Amount,
    registered: bool,
) -> anyhow::Result<()> {
    if registered {
        let mut sender = ctx.account(source)?;
        sender.details = AccountDetails::User;
        sender.delegate = prev_delegate.cloned();
        ctx.put_account(sender);
        ctx.update.delegates_removed.push(source.clone());
    } else if new_delegate == Some(source) {
        // self re-delegation of an existing delegate had no effects
    } else if let Some(new) = new_delegate {
        ctx.update_account(new, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance -= moved;
                info.delegators_count -= 1;
            }
        })?;
        ctx.update
            .delegators_removed
            .push((new.clone(), source.clone()));
        ctx.update_account(source, |a| a.delegate = prev_delegate.cloned())?;
    } else {
        ctx.update_account(source, |a| a.delegate = prev_delegate.cloned())?;
    }

    // rejoin the previous delegate
    if let Some(prev) = prev_delegate {
        ctx.update_account(prev, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance += moved;
                info.delegators_count += 1;
            }
        })?;
        ctx.update
            .delegators_added
            .push((prev.clone(), source.clone()));
    }
    Ok(())
}

//////////////////
// originations //
//////////////////

pub(crate) fn apply_origination_effects(
    ctx: &mut BlockContext,
    block: &Block,
    source: &Address,
    contract: &Address,
    balance: Amount,
) -> anyhow::Result<()> {
    if ctx.try_account(contract)?.is_some() {
        return Err(IndexerError::invariant(format!(
            "originated contract {contract} already exists"
        )));
    }
    let sender = ctx.account(source)?;
    if sender.balance < balance {
        return Err(IndexerError::invariant(format!(
            "{source} cannot endow {balance}"
        )));
    }
    let holder = stake_holder(&sender);

    ctx.update_account(source, |a| a.balance -= balance)?;
    if let Some(holder) = holder {
        ctx.update_account(&holder, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance -= balance;
            }
        })?;
    }

    let mut created = Account::new_contract(contract.clone(), source.clone(), block.level);
    created.balance = balance;
    created.add_op(OperationKind::Origination, block.level);
    ctx.put_account(created);
    Ok(())
}

pub(crate) fn revert_origination_effects(
    ctx: &mut BlockContext,
    source: &Address,
    contract: &Address,
    balance: Amount,
) -> anyhow::Result<()> {
    // whole-block LIFO guarantees nothing references the contract anymore
    ctx.remove_account(contract);

    let sender = ctx.account(source)?;
    let holder = stake_holder(&sender);
    ctx.update_account(source, |a| a.balance += balance)?;
    if let Some(holder) = holder {
        ctx.update_account(&holder, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance += balance;
            }
        })?;
    }
    Ok(())
}

///////////////
// internals //
///////////////

fn apply_internal(
    ctx: &mut BlockContext,
    block: &Block,
    hash: &OpHash,
    initiator: &Address,
    internal: &InternalContent,
) -> anyhow::Result<()> {
    let kind = match &internal.body {
        InternalBody::Transaction { .. } => OperationKind::Transaction,
        InternalBody::Delegation { .. } => OperationKind::Delegation,
        InternalBody::Origination { .. } => OperationKind::Origination,
        InternalBody::Event { .. } => OperationKind::Event,
    };
    track(ctx, &internal.source, kind, block.level)?;

    if !internal.status.is_applied() {
        let payload = failed_internal_payload(internal);
        push_operation(
            ctx,
            block,
            hash,
            kind,
            internal.source.clone(),
            None,
            Some(initiator.clone()),
            OperationStatus::Failed,
            payload,
        );
        return Ok(());
    }

    match &internal.body {
        InternalBody::Transaction {
            amount,
            destination,
            entrypoint,
        } => {
            ctx.account_or_create(destination, block.level)?;
            move_balance(ctx, &internal.source, destination, *amount)?;
            track(ctx, destination, kind, block.level)?;
            bigmap::apply_diffs(
                ctx,
                block.level,
                destination.is_contract().then_some(destination),
                &internal.bigmap_diffs,
            )?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                internal.source.clone(),
                Some(destination.clone()),
                Some(initiator.clone()),
                OperationStatus::Applied,
                OperationPayload::Transaction {
                    manager: None,
                    amount: *amount,
                    entrypoint: entrypoint.clone(),
                },
            );
        }
        InternalBody::Delegation { delegate } => {
            let effects =
                apply_delegation_effects(ctx, block, &internal.source, delegate.as_ref())?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                internal.source.clone(),
                delegate.clone(),
                Some(initiator.clone()),
                OperationStatus::Applied,
                OperationPayload::Delegation {
                    manager: None,
                    new_delegate: effects.new_delegate,
                    prev_delegate: effects.prev_delegate,
                    moved: effects.moved,
                    registered: effects.registered,
                },
            );
        }
        InternalBody::Origination { balance, contract } => {
            apply_origination_effects(ctx, block, &internal.source, contract, *balance)?;
            bigmap::apply_diffs(ctx, block.level, Some(contract), &internal.bigmap_diffs)?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                internal.source.clone(),
                Some(contract.clone()),
                Some(initiator.clone()),
                OperationStatus::Applied,
                OperationPayload::Origination {
                    manager: None,
                    contract: contract.clone(),
                    contract_balance: *balance,
                },
            );
        }
        InternalBody::Event { tag } => {
            push_operation(
                ctx,
                block,
                hash,
                kind,
                internal.source.clone(),
                None,
                Some(initiator.clone()),
                OperationStatus::Applied,
                OperationPayload::Event { tag: tag.clone() },
            );
        }
    }
    tickets::apply_updates(ctx, block.level, &internal.ticket_updates)?;
    Ok(())
}

fn failed_internal_payload(internal: &InternalContent) -> OperationPayload {
    match &internal.body {
        InternalBody::Transaction {
            amount, entrypoint, ..
        } => OperationPayload::Transaction {
            manager: None,
            amount: *amount,
            entrypoint: entrypoint.clone(),
        },
        InternalBody::Delegation { delegate } => OperationPayload::Delegation {
            manager: None,
            new_delegate: delegate.clone(),
            prev_delegate: None,
            moved: Amount::default(),
            registered: false,
        },
        InternalBody::Origination { balance, contract } => OperationPayload::Origination {
            manager: None,
            contract: contract.clone(),
            contract_balance: *balance,
        },
        InternalBody::Event { tag } => OperationPayload::Event { tag: tag.clone() },
    }
}

/////////////
// reverts //
/////////////

/// Revert one manager-family or internal operation record. Fee shells are
/// reverted for external records whether they applied or failed; content
/// effects only for applied records.
pub fn revert_manager(ctx: &mut BlockContext, block: &Block, op: &Operation) -> anyhow::Result<()> {
    if op.status.is_applied() {
        revert_effects(ctx, op)?;
    }
    if op.initiator.is_none() {
        if let Some(manager) = op.manager_info() {
            let manager = manager.clone();
            revert_manager_shell(ctx, block, &op.sender, &manager)?;
        }
    }
    untrack(ctx, &op.sender, op.kind, op)?;
    pop_operation(ctx, op);
    Ok(())
}

fn revert_effects(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    match &op.payload {
        OperationPayload::Reveal {
            prev_public_key, ..
        } => {
            let prev = prev_public_key.clone();
            ctx.update_account(&op.sender, |a| a.revealed_key = prev)?;
        }
        OperationPayload::Delegation {
            new_delegate,
            prev_delegate,
            moved,
            registered,
            ..
        } => {
            revert_delegation_effects(
                ctx,
                &op.sender,
                new_delegate.as_ref(),
                prev_delegate.as_ref(),
                *moved,
                *registered,
            )?;
        }
        OperationPayload::Origination {
            contract,
            contract_balance,
            ..
        } => {
            revert_origination_effects(ctx, &op.sender, contract, *contract_balance)?;
        }
        OperationPayload::Transaction { amount, .. } => {
            let destination = op
                .target
                .clone()
                .ok_or_else(|| IndexerError::invariant("transaction without destination"))?;
            move_balance(ctx, &destination, &op.sender, *amount)?;
            untrack(ctx, &destination, op.kind, op)?;
        }
        OperationPayload::TransferTicket { .. } => {
            let destination = op
                .target
                .clone()
                .ok_or_else(|| IndexerError::invariant("ticket transfer without destination"))?;
            untrack(ctx, &destination, op.kind, op)?;
        }
        OperationPayload::Event { .. } => {}
        _ => rollup::revert_effects(ctx, op)?,
    }
    Ok(())
}
