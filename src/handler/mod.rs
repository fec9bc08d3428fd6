//! Per-block apply and revert orchestration
//!
//! Apply runs fixed phases: protocol activation, voting/cycle boundaries,
//! baker crediting, then the four operation batches in order (consensus,
//! governance, anomaly, manager). Revert runs the same phases backwards,
//! sweeping all of the level's operation records in one descending-id pass
//! regardless of kind.
//!
//! Either direction stages every effect in one [BlockContext] and commits
//! it as a single batch, so a fault leaves the store untouched.

use crate::{
    base::{amount::Amount, op_hash::OpHash},
    block::{
        raw::{RawBlock, RawOperationGroup},
        store::BlockStore,
        Block, BlockEvents,
    },
    cache::BlockContext,
    commit::{self, anomaly, bigmap, block as block_commit, consensus, cycles, governance, manager, tickets},
    constants::BLOCK_REPORTING_FREQ_NUM,
    error::IndexerError,
    operation::{
        parse::ParsedContent, store::OperationStore, OperationKind, OperationKinds,
        OperationPayload,
    },
    protocol::{activator, ProtocolParams},
    store::IndexerStore,
};
use anyhow::bail;
use log::{debug, info};
use rayon::prelude::*;

/// Apply the next block. The raw payload must be exactly one level past
/// the chain cursor.
pub fn apply_block(store: &IndexerStore, raw: &RawBlock) -> anyhow::Result<()> {
    let mut ctx = BlockContext::new(store)?;
    if raw.level != ctx.state.level + 1 {
        bail!(
            "block {} does not extend the chain at {}",
            raw.level,
            ctx.state.level
        );
    }
    debug!("applying block {} ({})", raw.level, raw.hash);

    let mut block = Block {
        level: raw.level,
        hash: raw.hash.clone(),
        timestamp: raw.timestamp,
        baker: raw.baker.clone(),
        protocol: raw.protocol,
        cycle: 0,
        voting_period: 0,
        kinds: OperationKinds::default(),
        events: BlockEvents::default(),
        reward: Amount::default(),
        fees: Amount::default(),
        deactivated: vec![],
        baker_prev_level: 0,
    };
    let mut events = BlockEvents::default();

    // protocol activation and migrations
    if raw.protocol != ctx.state.protocol_version || ctx.state.blocks_count == 0 {
        activator::activate(&mut ctx, &block)?;
        events.insert(BlockEvents::PROTOCOL_BEGIN);
    }
    let params = ctx.protocol(raw.protocol)?.params;
    block.cycle = params.cycle_of(raw.level);
    block.voting_period = params.voting_period_of(raw.level);
    block.reward = params.block_reward;

    // boundaries
    if raw.level == block.voting_period * params.blocks_per_voting_period + 1 {
        governance::begin_period(&mut ctx, &params, block.voting_period, raw.level)?;
        events.insert(BlockEvents::VOTING_PERIOD_BEGIN);
    }
    if raw.level == (block.voting_period + 1) * params.blocks_per_voting_period {
        events.insert(BlockEvents::VOTING_PERIOD_END);
    }
    if raw.level == params.first_level_of_cycle(block.cycle) {
        events.insert(BlockEvents::CYCLE_BEGIN);
        block.deactivated = cycles::begin(&mut ctx, &params, block.cycle, raw.level)?;
        if !block.deactivated.is_empty() {
            events.insert(BlockEvents::DEACTIVATIONS);
        }
    }
    if raw.level == params.last_level_of_cycle(block.cycle) {
        events.insert(BlockEvents::CYCLE_END);
    }

    block_commit::apply(&mut ctx, &mut block, &params)?;

    // decode is pure, so the batches fan out across threads
    let batches: Vec<Vec<(OpHash, ParsedContent)>> = raw
        .operations
        .par_iter()
        .map(|batch| decode_batch(batch, raw.protocol))
        .collect::<anyhow::Result<_>>()?;

    let mut kinds = OperationKinds::default();
    let mut fees = Amount::default();
    for batch in &batches {
        for (hash, content) in batch {
            let dictated = apply_content(&mut ctx, &block, &params, hash, content)?;
            kinds.insert(content.kind());
            if let ParsedContent::Manager(mc) = content {
                fees += mc.fee;
            }
            if dictated {
                // the dictator decided; the rest of this batch never applies
                break;
            }
        }
    }

    block.kinds = kinds;
    block.fees = fees;
    block.events = events;
    ctx.update.blocks.push(block.clone());

    // advance the chain cursor
    ctx.update_protocol(raw.protocol, |p| p.weight += 1)?;
    ctx.state.level = raw.level;
    ctx.state.hash = raw.hash.clone();
    ctx.state.timestamp = raw.timestamp;
    ctx.state.voting_period = block.voting_period;
    ctx.state.blocks_count += 1;

    store.commit_update(ctx.into_update())?;
    if raw.level % BLOCK_REPORTING_FREQ_NUM == 0 {
        info!("indexed block {} ({})", raw.level, raw.hash);
    }
    Ok(())
}

fn decode_batch(
    batch: &[RawOperationGroup],
    version: u32,
) -> anyhow::Result<Vec<(OpHash, ParsedContent)>> {
    let mut parsed = vec![];
    for group in batch {
        let hash: OpHash = group.hash.parse()?;
        for content in &group.contents {
            parsed.push((hash.clone(), ParsedContent::parse(content, version)?));
        }
    }
    Ok(parsed)
}

/// Apply one decoded content. Returns true when it short-circuits the
/// rest of its batch (dictator proposal).
fn apply_content(
    ctx: &mut BlockContext,
    block: &Block,
    params: &ProtocolParams,
    hash: &OpHash,
    content: &ParsedContent,
) -> anyhow::Result<bool> {
    match content {
        ParsedContent::Endorsement { delegate, slots } => {
            consensus::apply_endorsement(ctx, block, params, hash, delegate, *slots)?
        }
        ParsedContent::Preendorsement { delegate, slots } => {
            consensus::apply_preendorsement(ctx, block, hash, delegate, *slots)?
        }
        ParsedContent::Proposals {
            source,
            period,
            proposals,
        } => {
            return governance::apply_proposals(ctx, block, params, hash, source, *period, proposals)
        }
        ParsedContent::Ballot {
            source,
            period,
            proposal,
            vote,
        } => governance::apply_ballot(ctx, block, hash, source, *period, proposal, *vote)?,
        ParsedContent::Activation { account, amount } => {
            anomaly::apply_activation(ctx, block, hash, account, *amount)?
        }
        ParsedContent::DoubleBaking {
            accused_level,
            offender,
        } => anomaly::apply_double_evidence(
            ctx,
            block,
            hash,
            OperationKind::DoubleBaking,
            *accused_level,
            offender,
        )?,
        ParsedContent::DoubleEndorsing {
            accused_level,
            offender,
        } => anomaly::apply_double_evidence(
            ctx,
            block,
            hash,
            OperationKind::DoubleEndorsing,
            *accused_level,
            offender,
        )?,
        ParsedContent::DoublePreendorsing {
            accused_level,
            offender,
        } => anomaly::apply_double_evidence(
            ctx,
            block,
            hash,
            OperationKind::DoublePreendorsing,
            *accused_level,
            offender,
        )?,
        ParsedContent::NonceRevelation { revealed_level } => anomaly::apply_revelation(
            ctx,
            block,
            params,
            hash,
            OperationPayload::NonceRevelation {
                revealed_level: *revealed_level,
                reward: params.nonce_revelation_reward,
            },
        )?,
        ParsedContent::VdfRevelation { .. } => anomaly::apply_revelation(
            ctx,
            block,
            params,
            hash,
            OperationPayload::VdfRevelation {
                reward: params.nonce_revelation_reward,
            },
        )?,
        ParsedContent::DrainDelegate {
            delegate,
            destination,
        } => anomaly::apply_drain(ctx, block, hash, delegate, destination)?,
        ParsedContent::Manager(mc) => manager::apply_manager(ctx, block, params, hash, mc)?,
    }
    Ok(false)
}

/// Revert the block at the chain cursor
pub fn revert_last_block(store: &IndexerStore) -> anyhow::Result<()> {
    let mut ctx = BlockContext::new(store)?;
    if ctx.state.blocks_count == 0 {
        bail!("nothing to revert");
    }
    let level = ctx.state.level;
    let block = store
        .get_block(level)?
        .ok_or_else(|| IndexerError::referential(format!("missing block {level}")))?;
    let params = ctx.protocol(block.protocol)?.params;
    info!("reverting block {level} ({})", block.hash);

    // cross-cutting projections first, they are independent of records
    tickets::revert_level(&mut ctx, level)?;
    bigmap::revert_level(&mut ctx, level)?;

    // one whole-block sweep, newest record first, regardless of kind
    let mut ops = store.get_operations_at(level)?;
    ops.sort_by(|a, b| b.id.cmp(&a.id));
    for op in &ops {
        match op.kind {
            OperationKind::Endorsement => {
                consensus::revert_endorsement(&mut ctx, &block, &params, op)?
            }
            OperationKind::Preendorsement => consensus::revert_preendorsement(&mut ctx, op)?,
            OperationKind::Proposal => governance::revert_proposal(&mut ctx, op)?,
            OperationKind::Ballot => governance::revert_ballot(&mut ctx, op)?,
            OperationKind::Activation => anomaly::revert_activation(&mut ctx, op)?,
            OperationKind::DoubleBaking
            | OperationKind::DoubleEndorsing
            | OperationKind::DoublePreendorsing => {
                anomaly::revert_double_evidence(&mut ctx, &block, op)?
            }
            OperationKind::NonceRevelation | OperationKind::VdfRevelation => {
                anomaly::revert_revelation(&mut ctx, &params, op)?
            }
            OperationKind::DrainDelegate => anomaly::revert_drain(&mut ctx, op)?,
            OperationKind::Migration => {
                activator::revert_migration(&mut ctx, op)?;
                commit::pop_operation(&mut ctx, op);
            }
            _ => manager::revert_manager(&mut ctx, &block, op)?,
        }
    }

    block_commit::revert(&mut ctx, &block, &params)?;
    if block.events.contains(BlockEvents::CYCLE_BEGIN) {
        cycles::revert_begin(&mut ctx, &params, block.cycle, &block.deactivated)?;
    }
    if block.events.contains(BlockEvents::VOTING_PERIOD_BEGIN) {
        governance::revert_begin_period(&mut ctx, block.voting_period)?;
    }

    // protocol weight goes back with its block; the row disappears when
    // no un-reverted block references the version anymore
    let mut protocol = ctx.protocol(block.protocol)?;
    protocol.weight -= 1;
    let drop_protocol = protocol.weight == 0;
    ctx.put_protocol(protocol);

    // rewind the chain cursor
    ctx.state.level = level - 1;
    ctx.state.blocks_count -= 1;
    match store.get_block(level - 1)? {
        Some(prev) => {
            ctx.state.hash = prev.hash;
            ctx.state.timestamp = prev.timestamp;
            ctx.state.protocol_version = prev.protocol;
            ctx.state.voting_period = prev.voting_period;
        }
        None => {
            ctx.state.hash = String::new();
            ctx.state.timestamp = 0;
            ctx.state.protocol_version = 0;
            ctx.state.voting_period = 0;
        }
    }
    if drop_protocol {
        let prev_version = ctx.state.protocol_version;
        activator::revert_activation(&mut ctx, block.protocol, prev_version)?;
    }

    store.commit_update(ctx.into_update())?;
    Ok(())
}
