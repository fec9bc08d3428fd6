//! Anomaly commits: activations, double-signing evidence, revelations,
//! delegate drains

use super::{pop_operation, push_operation, track, untrack};
use crate::{
    base::{address::Address, amount::Amount, op_hash::OpHash, Level},
    block::Block,
    cache::BlockContext,
    error::IndexerError,
    operation::{Operation, OperationKind, OperationPayload, OperationStatus},
    protocol::ProtocolParams,
};

/// Credit a commitment balance to a (possibly fresh) account
pub fn apply_activation(
    ctx: &mut BlockContext,
    block: &Block,
    hash: &OpHash,
    account: &Address,
    amount: Amount,
) -> anyhow::Result<()> {
    ctx.account_or_create(account, block.level)?;
    ctx.update_account(account, |a| a.balance += amount)?;
    track(ctx, account, OperationKind::Activation, block.level)?;

    push_operation(
        ctx,
        block,
        hash,
        OperationKind::Activation,
        account.clone(),
        None,
        None,
        OperationStatus::Applied,
        OperationPayload::Activation { amount },
    );
    Ok(())
}

pub fn revert_activation(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    let OperationPayload::Activation { amount } = &op.payload else {
        return Err(IndexerError::invariant("activation payload expected"));
    };
    ctx.update_account(&op.sender, |a| a.balance -= *amount)?;
    untrack(ctx, &op.sender, OperationKind::Activation, op)?;
    pop_operation(ctx, op);
    Ok(())
}

//////////////
// evidence //
//////////////

/// Double-signing evidence: the offender forfeits its frozen deposits,
/// half of which rewards the accusing baker. The amounts are recorded so
/// the revert moves back exactly what moved.
pub fn apply_double_evidence(
    ctx: &mut BlockContext,
    block: &Block,
    hash: &OpHash,
    kind: OperationKind,
    accused_level: Level,
    offender: &Address,
) -> anyhow::Result<()> {
    let mut offender_account = ctx.account(offender)?;
    let Some(info) = offender_account.as_delegate_mut() else {
        return Err(IndexerError::referential(format!(
            "evidence offender {offender} is not a delegate"
        )));
    };
    let slashed = info.frozen_deposits;
    let reward = Amount(slashed.0 / 2);
    info.frozen_deposits -= slashed;
    info.staking_balance -= slashed;
    ctx.put_account(offender_account);

    ctx.update_account(&block.baker, |b| {
        if let Some(info) = b.as_delegate_mut() {
            info.frozen_rewards += reward;
        }
    })?;
    track(ctx, offender, kind, block.level)?;

    let payload = match kind {
        OperationKind::DoubleBaking => OperationPayload::DoubleBaking {
            accused_level,
            slashed,
            reward,
        },
        OperationKind::DoubleEndorsing => OperationPayload::DoubleEndorsing {
            accused_level,
            slashed,
            reward,
        },
        OperationKind::DoublePreendorsing => OperationPayload::DoublePreendorsing {
            accused_level,
            slashed,
            reward,
        },
        _ => return Err(IndexerError::invariant("evidence kind expected")),
    };
    push_operation(
        ctx,
        block,
        hash,
        kind,
        block.baker.clone(),
        Some(offender.clone()),
        None,
        OperationStatus::Applied,
        payload,
    );
    Ok(())
}

pub fn revert_double_evidence(ctx: &mut BlockContext, block: &Block, op: &Operation) -> anyhow::Result<()> {
    let (slashed, reward) = match &op.payload {
        OperationPayload::DoubleBaking {
            slashed, reward, ..
        }
        | OperationPayload::DoubleEndorsing {
            slashed, reward, ..
        }
        | OperationPayload::DoublePreendorsing {
            slashed, reward, ..
        } => (*slashed, *reward),
        _ => return Err(IndexerError::invariant("evidence payload expected")),
    };
    let offender = op
        .target
        .clone()
        .ok_or_else(|| IndexerError::invariant("evidence without offender"))?;

    ctx.update_account(&offender, |a| {
        if let Some(info) = a.as_delegate_mut() {
            info.frozen_deposits += slashed;
            info.staking_balance += slashed;
        }
    })?;
    ctx.update_account(&block.baker, |b| {
        if let Some(info) = b.as_delegate_mut() {
            info.frozen_rewards -= reward;
        }
    })?;
    untrack(ctx, &offender, op.kind, op)?;
    pop_operation(ctx, op);
    Ok(())
}

/////////////////
// revelations //
/////////////////

/// Nonce and vdf revelations both freeze a fixed reward for the baker
/// that included them.
pub fn apply_revelation(
    ctx: &mut BlockContext,
    block: &Block,
    params: &ProtocolParams,
    hash: &OpHash,
    payload: OperationPayload,
) -> anyhow::Result<()> {
    let kind = match payload {
        OperationPayload::NonceRevelation { .. } => OperationKind::NonceRevelation,
        OperationPayload::VdfRevelation { .. } => OperationKind::VdfRevelation,
        _ => return Err(IndexerError::invariant("revelation payload expected")),
    };
    let reward = params.nonce_revelation_reward;

    ctx.update_account(&block.baker, |b| {
        if let Some(info) = b.as_delegate_mut() {
            info.frozen_rewards += reward;
        }
    })?;
    track(ctx, &block.baker, kind, block.level)?;

    push_operation(
        ctx,
        block,
        hash,
        kind,
        block.baker.clone(),
        None,
        None,
        OperationStatus::Applied,
        payload,
    );
    Ok(())
}

pub fn revert_revelation(
    ctx: &mut BlockContext,
    params: &ProtocolParams,
    op: &Operation,
) -> anyhow::Result<()> {
    let reward = params.nonce_revelation_reward;
    ctx.update_account(&op.sender, |b| {
        if let Some(info) = b.as_delegate_mut() {
            info.frozen_rewards -= reward;
        }
    })?;
    untrack(ctx, &op.sender, op.kind, op)?;
    pop_operation(ctx, op);
    Ok(())
}

////////////////////
// drain delegate //
////////////////////

/// The drained delegate's entire spendable balance moves to the
/// destination. The moved amount is recorded for the exact revert.
pub fn apply_drain(
    ctx: &mut BlockContext,
    block: &Block,
    hash: &OpHash,
    delegate: &Address,
    destination: &Address,
) -> anyhow::Result<()> {
    let drained = ctx.account(delegate)?;
    if !drained.is_delegate() {
        return Err(IndexerError::referential(format!(
            "drain of non-delegate {delegate}"
        )));
    }
    let amount = drained.balance;
    ctx.account_or_create(destination, block.level)?;
    super::move_balance(ctx, delegate, destination, amount)?;

    track(ctx, delegate, OperationKind::DrainDelegate, block.level)?;
    track(ctx, destination, OperationKind::DrainDelegate, block.level)?;

    push_operation(
        ctx,
        block,
        hash,
        OperationKind::DrainDelegate,
        delegate.clone(),
        Some(destination.clone()),
        None,
        OperationStatus::Applied,
        OperationPayload::DrainDelegate { amount },
    );
    Ok(())
}

pub fn revert_drain(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    let OperationPayload::DrainDelegate { amount } = &op.payload else {
        return Err(IndexerError::invariant("drain payload expected"));
    };
    let destination = op
        .target
        .clone()
        .ok_or_else(|| IndexerError::invariant("drain without destination"))?;

    super::move_balance(ctx, &destination, &op.sender, *amount)?;
    untrack(ctx, &destination, OperationKind::DrainDelegate, op)?;
    untrack(ctx, &op.sender, OperationKind::DrainDelegate, op)?;
    pop_operation(ctx, op);
    Ok(())
}
