//! Voting period rollover and the dictator short-circuit

use dpos_indexer::{
    account::Account,
    base::{address::Address, amount::Amount, op_hash::OpHash},
    block::{raw::RawBlock, Block, BlockEvents},
    cache::BlockContext,
    commit::governance,
    handler,
    operation::{store::OperationStore, OperationKinds},
    protocol::ProtocolParams,
    store::IndexerStore,
    voting::{
        store::VotingStore, PeriodKind, PeriodStatus, Proposal, ProposalHash, ProposalStatus,
        VotingPeriod,
    },
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

const BAKER: &str = "tz1gg5bjopPcr9agjamyu9BbXKLibNc2rbAq";
const VOTER: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";
const PROPOSER: &str = "tz1WnfXMPaNTBmH7DBPwqCWs9cPDJdkGBTZ8";
/// v3 dictator, see `constants::PROTO3_DICTATOR_ADDRESS`
const DICTATOR: &str = "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU";
const PROPOSAL: &str = "PtKathmankSpLLDALzWw7CGD2j2MtyveTwboEYokqUCP4a1LxMg";
const PROPOSAL_B: &str = "PsDELPH1Kxsxt8f9eWbxQeRxkjfbxoqM52jvs5Y5fBxWWh4ifpo";
const PROPOSAL_C: &str = "PtGRANADsDU8R9daYKAgWnQYAJ64omN1o3KMGVCykShA97vQbvV";

fn block_at(level: u32) -> Block {
    Block {
        level,
        hash: format!("BL{level}"),
        timestamp: 0,
        baker: Address::new(BAKER),
        protocol: 1,
        cycle: 0,
        voting_period: 0,
        kinds: OperationKinds::default(),
        events: BlockEvents::default(),
        reward: Amount::default(),
        fees: Amount::default(),
        deactivated: vec![],
        baker_prev_level: 0,
    }
}

// node operation hashes are 51 base58 characters
fn group_hash(tag: &str) -> String {
    format!("oo{tag:1<49}")
}

fn raw_block(level: u32, operations: Value) -> RawBlock {
    RawBlock::from_value(json!({
        "level": level,
        "hash": format!("BL{level}"),
        "timestamp": 1_700_000_000u32 + level,
        "baker": BAKER,
        "protocol": 3,
        "operations": operations,
    }))
    .expect("raw block")
}

fn proposals_group(tag: &str, source: &str, proposal: &str) -> Value {
    json!({
        "hash": group_hash(tag),
        "contents": [{
            "kind": "proposals",
            "source": source,
            "period": 0,
            "proposals": [proposal],
        }],
    })
}

#[test]
fn dictator_short_circuits_the_batch() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("dictator")?;
    let store = IndexerStore::new(tmp.path())?;
    let mut ctx = BlockContext::new(&store)?;

    let dictator = Address::new(DICTATOR);
    let voter = Address::new(VOTER);
    ctx.put_account(Account::new_user(dictator.clone(), 1));
    ctx.put_account(Account::new_user(voter.clone(), 1));
    ctx.put_period(VotingPeriod::new(0, PeriodKind::Proposal, 1, 100));

    let params = ProtocolParams {
        dictator: Some(dictator.clone()),
        ..ProtocolParams::for_version(1)
    };
    let block = block_at(1);
    let hash = OpHash("ooProp1".into());
    let proposal = ProposalHash::new(PROPOSAL);

    let dictated = governance::apply_proposals(
        &mut ctx,
        &block,
        &params,
        &hash,
        &voter,
        0,
        &[proposal.clone()],
    )?;
    assert!(!dictated);

    let dictated = governance::apply_proposals(
        &mut ctx,
        &block,
        &params,
        &hash,
        &dictator,
        0,
        &[proposal.clone()],
    )?;
    assert!(dictated);

    assert_eq!(2, ctx.proposal(&proposal)?.upvotes);
    assert_eq!(2, ctx.period(0)?.upvotes);
    Ok(())
}

#[test]
fn dictator_proposal_ends_its_block_batch() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("dictator_batch")?;
    let store = IndexerStore::new(tmp.path())?;

    let activations = json!([{
        "hash": group_hash("Act"),
        "contents": [
            { "kind": "activate_account", "pkh": VOTER, "balance": "1000000" },
            { "kind": "activate_account", "pkh": DICTATOR, "balance": "1000000" },
            { "kind": "activate_account", "pkh": PROPOSER, "balance": "1000000" },
        ],
    }]);
    handler::apply_block(&store, &raw_block(1, json!([[], [], activations, []])))?;

    // the dictator's proposal decides the batch, the third group never applies
    let batch = json!([
        proposals_group("PropA", VOTER, PROPOSAL),
        proposals_group("PropB", DICTATOR, PROPOSAL_B),
        proposals_group("PropC", PROPOSER, PROPOSAL_C),
    ]);
    handler::apply_block(&store, &raw_block(2, json!([[], batch, [], []])))?;

    let recorded = store.get_operations_at(2)?;
    assert_eq!(2, recorded.len());
    assert!(store.get_proposal(&ProposalHash::new(PROPOSAL_C))?.is_none());

    let dictated = store
        .get_proposal(&ProposalHash::new(PROPOSAL_B))?
        .expect("dictator proposal");
    assert_eq!(1, dictated.upvotes);
    assert_eq!(2, store.get_voting_period(0)?.expect("period 0").upvotes);
    Ok(())
}

#[test]
fn rollover_carries_the_winner_and_revert_reopens() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("rollover")?;
    let store = IndexerStore::new(tmp.path())?;
    let params = ProtocolParams {
        blocks_per_voting_period: 100,
        ..ProtocolParams::for_version(1)
    };
    let proposal = ProposalHash::new(PROPOSAL);

    let mut ctx = BlockContext::new(&store)?;
    ctx.put_period(VotingPeriod::new(0, PeriodKind::Proposal, 1, 100));
    ctx.put_proposal(Proposal {
        hash: proposal.clone(),
        initiator: Address::new(VOTER),
        period: 0,
        first_level: 5,
        upvotes: 3,
        status: ProposalStatus::Active,
    });
    store.commit_update(ctx.into_update())?;

    let mut ctx = BlockContext::new(&store)?;
    governance::begin_period(&mut ctx, &params, 1, 101)?;
    store.commit_update(ctx.into_update())?;

    let prev = store.get_voting_period(0)?.expect("period 0");
    assert_eq!(PeriodStatus::Accepted, prev.status);
    assert_eq!(Some(proposal.clone()), prev.winner);

    let opened = store.get_voting_period(1)?.expect("period 1");
    assert_eq!(PeriodKind::Exploration, opened.kind);
    assert_eq!(Some(proposal.clone()), opened.winner);

    let mut ctx = BlockContext::new(&store)?;
    governance::revert_begin_period(&mut ctx, 1)?;
    store.commit_update(ctx.into_update())?;

    assert!(store.get_voting_period(1)?.is_none());
    let reopened = store.get_voting_period(0)?.expect("period 0");
    assert_eq!(PeriodStatus::Active, reopened.status);
    assert_eq!(None, reopened.winner);
    Ok(())
}

#[test]
fn rejected_exploration_returns_to_proposals() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("rejected")?;
    let store = IndexerStore::new(tmp.path())?;
    let params = ProtocolParams {
        blocks_per_voting_period: 100,
        ..ProtocolParams::for_version(1)
    };

    let mut ctx = BlockContext::new(&store)?;
    let mut exploration = VotingPeriod::new(0, PeriodKind::Exploration, 1, 100);
    exploration.winner = Some(ProposalHash::new(PROPOSAL));
    exploration.yay = 2;
    exploration.nay = 5;
    ctx.put_period(exploration);
    store.commit_update(ctx.into_update())?;

    let mut ctx = BlockContext::new(&store)?;
    governance::begin_period(&mut ctx, &params, 1, 101)?;
    store.commit_update(ctx.into_update())?;

    let closed = store.get_voting_period(0)?.expect("period 0");
    assert_eq!(PeriodStatus::Rejected, closed.status);

    let opened = store.get_voting_period(1)?.expect("period 1");
    assert_eq!(PeriodKind::Proposal, opened.kind);
    assert_eq!(None, opened.winner);
    Ok(())
}
