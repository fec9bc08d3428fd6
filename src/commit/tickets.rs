//! Ticket update aggregation
//!
//! Signed balance deltas attached to applied manager operations. Balances
//! are projected per `(ticketer, account)`; a zero balance drops the row so
//! a full revert leaves no residue.

use crate::{
    base::{address::Address, Level},
    cache::BlockContext,
    operation::parse::RawTicketUpdate,
};
use serde::{Deserialize, Serialize};

pub trait TicketStore {
    fn get_ticket_balance(&self, ticketer: &Address, account: &Address) -> anyhow::Result<i64>;

    /// Transfer records at `level`, ascending by index
    fn get_ticket_transfers_at(&self, level: Level) -> anyhow::Result<Vec<TicketTransfer>>;
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TicketTransfer {
    pub level: Level,
    /// position within the level, assigned in apply order
    pub index: u32,
    pub ticketer: Address,
    pub account: Address,
    pub delta: i64,
}

/// Current balance of a pair, seeing writes already staged in this block
fn current_balance(ctx: &BlockContext, ticketer: &Address, account: &Address) -> anyhow::Result<i64> {
    for (t, a, balance) in ctx.update.ticket_balances.iter().rev() {
        if t == ticketer && a == account {
            return Ok(*balance);
        }
    }
    ctx.store.get_ticket_balance(ticketer, account)
}

/// Apply the ticket deltas of one operation, returning how many were
/// recorded (kept in the operation payload).
pub fn apply_updates(
    ctx: &mut BlockContext,
    level: Level,
    updates: &[RawTicketUpdate],
) -> anyhow::Result<u32> {
    for update in updates {
        let balance = current_balance(ctx, &update.ticketer, &update.account)?;
        let index = ctx.update.ticket_transfers.len() as u32;
        ctx.update.ticket_balances.push((
            update.ticketer.clone(),
            update.account.clone(),
            balance + update.amount,
        ));
        ctx.update.ticket_transfers.push(TicketTransfer {
            level,
            index,
            ticketer: update.ticketer.clone(),
            account: update.account.clone(),
            delta: update.amount,
        });
    }
    Ok(updates.len() as u32)
}

/// Replay a level's transfers backwards, subtracting each delta
pub fn revert_level(ctx: &mut BlockContext, level: Level) -> anyhow::Result<()> {
    let mut transfers = ctx.store.get_ticket_transfers_at(level)?;
    transfers.sort_by(|a, b| b.index.cmp(&a.index));

    for transfer in transfers {
        let balance = current_balance(ctx, &transfer.ticketer, &transfer.account)?;
        ctx.update.ticket_balances.push((
            transfer.ticketer.clone(),
            transfer.account.clone(),
            balance - transfer.delta,
        ));
        ctx.update
            .deleted_ticket_transfers
            .push((transfer.level, transfer.index));
    }
    Ok(())
}
