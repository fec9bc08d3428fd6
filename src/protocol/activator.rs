//! Protocol activation and the migrations between versions
//!
//! Migration effects run between blocks of different versions. Each one is
//! recorded as a [OperationKind::Migration] pseudo-operation so the revert
//! sweep can undo it like any other operation.

use super::Protocol;
use crate::{
    base::{address::Address, op_hash::OpHash},
    block::Block,
    cache::BlockContext,
    constants::{PROTO2_INVOICE_ADDRESS, PROTO2_INVOICE_AMOUNT},
    error::IndexerError,
    operation::{Operation, OperationKind, OperationPayload, OperationStatus},
};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum MigrationKind {
    /// One-off credit granted by a protocol upgrade
    ProtocolInvoice,
}

type MigrationStep = fn(&mut BlockContext, &Block) -> anyhow::Result<()>;

/// Migration steps between two adjacent protocol versions, in apply order
fn steps(from: u32, to: u32) -> &'static [MigrationStep] {
    match (from, to) {
        (1, 2) => &[invoice_migration],
        _ => &[],
    }
}

/// Install the protocol the block belongs to and run the migrations from
/// the previously active version.
pub fn activate(ctx: &mut BlockContext, block: &Block) -> anyhow::Result<()> {
    let from = ctx.state.protocol_version;
    let to = block.protocol;
    info!("activating protocol v{to} at {}", block.level);

    if ctx.try_protocol(to)?.is_some() {
        return Err(IndexerError::invariant(format!(
            "protocol v{to} already active"
        )));
    }
    ctx.put_protocol(Protocol::activate(to, block.level));
    ctx.state.protocol_version = to;

    for step in steps(from, to) {
        step(ctx, block)?;
    }
    Ok(())
}

/// Drop a protocol whose weight went back to zero
pub fn revert_activation(ctx: &mut BlockContext, version: u32, prev_version: u32) -> anyhow::Result<()> {
    info!("deactivating protocol v{version}");
    ctx.remove_protocol(version);
    ctx.state.protocol_version = prev_version;
    Ok(())
}

/// Undo one recorded migration pseudo-operation
pub fn revert_migration(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    let OperationPayload::Migration { balance_change, .. } = &op.payload else {
        return Err(IndexerError::invariant("migration payload expected"));
    };

    let mut account = ctx.account(&op.sender)?;
    account.balance = account.balance.apply_delta(-balance_change);
    account.migrations_count -= 1;
    if let Some(prev) = op.prev_level_of(&op.sender) {
        account.last_level = prev;
    }
    let delegate = account.delegate.clone();
    let erasable = account.is_erasable();
    ctx.put_account(account);

    if let Some(delegate) = delegate {
        let change = *balance_change;
        ctx.update_account(&delegate, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance = info.staking_balance.apply_delta(-change);
            }
        })?;
    }
    if erasable {
        ctx.remove_account(&op.sender);
    }
    ctx.state.migrations_count -= 1;
    Ok(())
}

fn credit(
    ctx: &mut BlockContext,
    block: &Block,
    kind: MigrationKind,
    addr: &Address,
    balance_change: i64,
) -> anyhow::Result<()> {
    let mut account = ctx.account_or_create(addr, block.level)?;
    let prev_level = account.last_level;
    account.balance = account.balance.apply_delta(balance_change);
    account.migrations_count += 1;
    account.last_level = block.level;
    let delegate = account.delegate.clone();
    ctx.put_account(account);

    if let Some(delegate) = delegate {
        ctx.update_account(&delegate, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance = info.staking_balance.apply_delta(balance_change);
            }
        })?;
    }

    let id = ctx.state.next_operation_id();
    ctx.state.migrations_count += 1;
    ctx.update.operations.push(Operation {
        id,
        level: block.level,
        timestamp: block.timestamp,
        hash: OpHash(block.hash.clone()),
        kind: OperationKind::Migration,
        sender: addr.clone(),
        target: None,
        initiator: None,
        status: OperationStatus::Applied,
        prev_levels: vec![(addr.clone(), prev_level)],
        payload: OperationPayload::Migration {
            kind,
            balance_change,
        },
    });
    Ok(())
}

/// v2 invoice: one-off credit to the address that funded the upgrade work
fn invoice_migration(ctx: &mut BlockContext, block: &Block) -> anyhow::Result<()> {
    credit(
        ctx,
        block,
        MigrationKind::ProtocolInvoice,
        &Address::new(PROTO2_INVOICE_ADDRESS),
        PROTO2_INVOICE_AMOUNT.0 as i64,
    )
}
