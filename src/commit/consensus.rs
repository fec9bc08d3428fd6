//! Consensus attestation commits

use super::{pop_operation, push_operation, track, untrack};
use crate::{
    base::{address::Address, amount::Amount, op_hash::OpHash},
    block::Block,
    cache::BlockContext,
    error::IndexerError,
    operation::{Operation, OperationKind, OperationPayload, OperationStatus},
    protocol::ProtocolParams,
};

fn endorsement_reward(params: &ProtocolParams, slots: u32) -> Amount {
    Amount(params.endorsement_reward.0 * slots as u64)
}

/// The endorser freezes one reward per attested slot
pub fn apply_endorsement(
    ctx: &mut BlockContext,
    block: &Block,
    params: &ProtocolParams,
    hash: &OpHash,
    delegate: &Address,
    slots: u32,
) -> anyhow::Result<()> {
    let reward = endorsement_reward(params, slots);
    ctx.update_account(delegate, |a| {
        if let Some(info) = a.as_delegate_mut() {
            info.frozen_rewards += reward;
        }
    })?;
    ctx.update_baker_cycle(block.cycle, delegate, |bc| {
        bc.endorsements += slots;
        bc.endorsement_rewards += reward;
    })?;
    track(ctx, delegate, OperationKind::Endorsement, block.level)?;

    push_operation(
        ctx,
        block,
        hash,
        OperationKind::Endorsement,
        delegate.clone(),
        None,
        None,
        OperationStatus::Applied,
        OperationPayload::Endorsement { slots },
    );
    Ok(())
}

pub fn revert_endorsement(
    ctx: &mut BlockContext,
    block: &Block,
    params: &ProtocolParams,
    op: &Operation,
) -> anyhow::Result<()> {
    let OperationPayload::Endorsement { slots } = &op.payload else {
        return Err(IndexerError::invariant("endorsement payload expected"));
    };
    let reward = endorsement_reward(params, *slots);

    ctx.update_account(&op.sender, |a| {
        if let Some(info) = a.as_delegate_mut() {
            info.frozen_rewards -= reward;
        }
    })?;
    ctx.update_baker_cycle(block.cycle, &op.sender, |bc| {
        bc.endorsements -= slots;
        bc.endorsement_rewards -= reward;
    })?;
    untrack(ctx, &op.sender, OperationKind::Endorsement, op)?;
    pop_operation(ctx, op);
    Ok(())
}

/// Preendorsements carry no reward, only the record
pub fn apply_preendorsement(
    ctx: &mut BlockContext,
    block: &Block,
    hash: &OpHash,
    delegate: &Address,
    slots: u32,
) -> anyhow::Result<()> {
    track(ctx, delegate, OperationKind::Preendorsement, block.level)?;
    push_operation(
        ctx,
        block,
        hash,
        OperationKind::Preendorsement,
        delegate.clone(),
        None,
        None,
        OperationStatus::Applied,
        OperationPayload::Preendorsement { slots },
    );
    Ok(())
}

pub fn revert_preendorsement(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    untrack(ctx, &op.sender, OperationKind::Preendorsement, op)?;
    pop_operation(ctx, op);
    Ok(())
}
