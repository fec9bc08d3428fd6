//! Governance commits: proposals, ballots, period rollover
//!
//! A proposals operation from the configured dictator short-circuits the
//! rest of the governance batch: the caller must stop applying the
//! remaining entries of that batch when `dictated` comes back true.

use super::{pop_operation, push_operation, track, untrack};
use crate::{
    base::{address::Address, op_hash::OpHash},
    block::Block,
    cache::BlockContext,
    error::IndexerError,
    operation::{Operation, OperationKind, OperationPayload, OperationStatus},
    protocol::ProtocolParams,
    voting::{
        store::VotingStore, PeriodKind, PeriodStatus, Proposal, ProposalHash, ProposalStatus,
        Vote, VotingPeriod,
    },
};
use log::info;

///////////////
// proposals //
///////////////

/// Apply one proposals operation (one record per proposed hash).
/// Returns true when the source is the dictator.
pub fn apply_proposals(
    ctx: &mut BlockContext,
    block: &Block,
    params: &ProtocolParams,
    hash: &OpHash,
    source: &Address,
    period: u32,
    proposals: &[ProposalHash],
) -> anyhow::Result<bool> {
    let dictator = params.dictator.as_ref() == Some(source);

    for proposal_hash in proposals {
        match ctx.try_proposal(proposal_hash)? {
            Some(mut proposal) => {
                proposal.upvotes += 1;
                ctx.put_proposal(proposal);
            }
            None => ctx.put_proposal(Proposal {
                hash: proposal_hash.clone(),
                initiator: source.clone(),
                period,
                first_level: block.level,
                upvotes: 1,
                status: ProposalStatus::Active,
            }),
        }
        ctx.update_period(period, |p| p.upvotes += 1)?;
        track(ctx, source, OperationKind::Proposal, block.level)?;

        push_operation(
            ctx,
            block,
            hash,
            OperationKind::Proposal,
            source.clone(),
            None,
            None,
            OperationStatus::Applied,
            OperationPayload::Proposal {
                proposal: proposal_hash.clone(),
                period,
                dictator,
            },
        );
    }

    if dictator {
        info!("dictator proposal at {}, batch short-circuits", block.level);
    }
    Ok(dictator)
}

/// A proposal entity disappears with its last upvote
pub fn revert_proposal(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    let OperationPayload::Proposal {
        proposal, period, ..
    } = &op.payload
    else {
        return Err(IndexerError::invariant("proposal payload expected"));
    };

    let mut entity = ctx.proposal(proposal)?;
    entity.upvotes -= 1;
    if entity.upvotes == 0 {
        ctx.remove_proposal(proposal);
    } else {
        ctx.put_proposal(entity);
    }
    ctx.update_period(*period, |p| p.upvotes -= 1)?;
    untrack(ctx, &op.sender, OperationKind::Proposal, op)?;
    pop_operation(ctx, op);
    Ok(())
}

/////////////
// ballots //
/////////////

pub fn apply_ballot(
    ctx: &mut BlockContext,
    block: &Block,
    hash: &OpHash,
    source: &Address,
    period: u32,
    proposal: &ProposalHash,
    vote: Vote,
) -> anyhow::Result<()> {
    if ctx.try_proposal(proposal)?.is_none() {
        return Err(IndexerError::referential(format!(
            "ballot for unknown proposal {proposal}"
        )));
    }
    ctx.update_period(period, |p| match vote {
        Vote::Yay => p.yay += 1,
        Vote::Nay => p.nay += 1,
        Vote::Pass => p.pass += 1,
    })?;
    track(ctx, source, OperationKind::Ballot, block.level)?;

    push_operation(
        ctx,
        block,
        hash,
        OperationKind::Ballot,
        source.clone(),
        None,
        None,
        OperationStatus::Applied,
        OperationPayload::Ballot {
            proposal: proposal.clone(),
            period,
            vote,
        },
    );
    Ok(())
}

pub fn revert_ballot(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    let OperationPayload::Ballot { period, vote, .. } = &op.payload else {
        return Err(IndexerError::invariant("ballot payload expected"));
    };
    ctx.update_period(*period, |p| match vote {
        Vote::Yay => p.yay -= 1,
        Vote::Nay => p.nay -= 1,
        Vote::Pass => p.pass -= 1,
    })?;
    untrack(ctx, &op.sender, OperationKind::Ballot, op)?;
    pop_operation(ctx, op);
    Ok(())
}

/////////////////////
// period rollover //
/////////////////////

/// Finalize the period ending before `index` and open the new one
pub fn begin_period(
    ctx: &mut BlockContext,
    params: &ProtocolParams,
    index: u32,
    first_level: crate::base::Level,
) -> anyhow::Result<()> {
    let (next_kind, carried) = match index.checked_sub(1) {
        None => (PeriodKind::Proposal, None),
        Some(prev_index) => {
            let mut prev = ctx.period(prev_index)?;
            let outcome = finalize(ctx, &mut prev)?;
            let kind = prev.kind;
            let winner = prev.winner.clone();
            ctx.put_period(prev);
            match outcome {
                PeriodStatus::NoWinner | PeriodStatus::Rejected => (PeriodKind::Proposal, None),
                _ => (kind.next(), winner),
            }
        }
    };

    info!("voting period {index} ({next_kind:?}) begins at {first_level}");
    let mut period = VotingPeriod::new(
        index,
        next_kind,
        first_level,
        params.blocks_per_voting_period,
    );
    // ballot periods vote on the winner carried over from the last period
    if next_kind != PeriodKind::Proposal {
        period.winner = carried;
    }
    ctx.put_period(period);
    Ok(())
}

/// Undo [begin_period]: drop the new row, reopen the previous one
pub fn revert_begin_period(ctx: &mut BlockContext, index: u32) -> anyhow::Result<()> {
    ctx.remove_period(index);
    if let Some(prev_index) = index.checked_sub(1) {
        ctx.update_period(prev_index, |p| {
            p.status = PeriodStatus::Active;
            // ballot periods keep the winner they were opened with
            if p.kind == PeriodKind::Proposal {
                p.winner = None;
            }
        })?;
    }
    Ok(())
}

fn finalize(ctx: &mut BlockContext, period: &mut VotingPeriod) -> anyhow::Result<PeriodStatus> {
    if period.status != PeriodStatus::Active {
        return Ok(period.status);
    }
    let outcome = match period.kind {
        PeriodKind::Proposal => {
            // most-upvoted proposal of the period wins, if any
            let winner = ctx
                .store
                .get_proposals()?
                .into_iter()
                .filter(|p| p.period == period.index)
                .max_by_key(|p| p.upvotes);
            match winner {
                Some(proposal) => {
                    period.winner = Some(proposal.hash);
                    PeriodStatus::Accepted
                }
                None => PeriodStatus::NoWinner,
            }
        }
        PeriodKind::Exploration | PeriodKind::Promotion => {
            if period.yay > period.nay {
                PeriodStatus::Accepted
            } else {
                PeriodStatus::Rejected
            }
        }
    };
    period.status = outcome;
    Ok(outcome)
}
