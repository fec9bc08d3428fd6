//! Whole-block apply/revert round trips against a real store

use dpos_indexer::{
    account::store::AccountStore,
    base::{address::Address, amount::Amount},
    block::{raw::RawBlock, store::BlockStore},
    cycle::store::CycleStore,
    handler,
    operation::store::OperationStore,
    protocol::store::ProtocolStore,
    state::{store::StateStore, AppState},
    store::IndexerStore,
    voting::store::VotingStore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

const BAKER: &str = "tz1gg5bjopPcr9agjamyu9BbXKLibNc2rbAq";
const SENDER: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";
const DEST: &str = "tz1WnfXMPaNTBmH7DBPwqCWs9cPDJdkGBTZ8";

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
        "protocol": 1,
        "operations": operations,
    }))
    .expect("raw block")
}

fn group(hash: &str, contents: Vec<Value>) -> Value {
    json!({ "hash": hash, "contents": contents })
}

fn activation(account: &str, balance: u64) -> Value {
    json!({
        "kind": "activate_account",
        "pkh": account,
        "balance": balance.to_string(),
    })
}

fn reveal(source: &str, fee: u64, counter: u64) -> Value {
    json!({
        "kind": "reveal",
        "source": source,
        "fee": fee.to_string(),
        "counter": counter.to_string(),
        "gas_limit": "1000",
        "storage_limit": "0",
        "public_key": "edpkuBknW28nW72KG6RoHtYW7p12T6GKc7nAbwYX5m8Wd9sDVC9yav",
        "result": { "status": "applied" },
    })
}

fn transaction(source: &str, fee: u64, counter: u64, amount: u64, destination: &str) -> Value {
    json!({
        "kind": "transaction",
        "source": source,
        "fee": fee.to_string(),
        "counter": counter.to_string(),
        "gas_limit": "10000",
        "storage_limit": "300",
        "amount": amount.to_string(),
        "destination": destination,
        "result": { "status": "applied" },
    })
}

fn endorsement(delegate: &str, slots: u32) -> Value {
    json!({ "kind": "endorsement", "delegate": delegate, "slots": slots })
}

/// Genesis-style first block: activates the protocol, opens cycle 0 and
/// voting period 0, and funds the sender via a commitment activation.
fn first_block() -> RawBlock {
    raw_block(
        1,
        json!([[], [], [group(&group_hash("Act1"), vec![activation(SENDER, 2_000_000)])], []]),
    )
}

#[test]
fn fee_flow_is_charged_per_content() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("fee_flow")?;
    let store = IndexerStore::new(tmp.path())?;

    handler::apply_block(&store, &first_block())?;
    handler::apply_block(
        &store,
        &raw_block(
            2,
            json!([[], [], [], [group(
                &group_hash("Mgr1"),
                vec![
                    reveal(SENDER, 1_000, 1),
                    transaction(SENDER, 1_500, 2, 500_000, DEST),
                ],
            )]]),
        ),
    )?;

    let sender = store.get_account(&Address::new(SENDER))?.expect("sender");
    assert_eq!(Amount(2_000_000 - 1_000 - 1_500 - 500_000), sender.balance);
    assert_eq!(2, sender.counter);
    assert!(sender.revealed_key.is_some());

    let dest = store.get_account(&Address::new(DEST))?.expect("destination");
    assert_eq!(Amount(500_000), dest.balance);

    let baker = store.get_account(&Address::new(BAKER))?.expect("baker");
    let info = baker.as_delegate().expect("baker is a delegate");
    assert_eq!(Amount(2_500), info.frozen_fees);

    // every applied block counts toward its protocol's weight
    assert_eq!(2, store.get_protocol(1)?.expect("protocol").weight);
    Ok(())
}

#[test]
fn apply_then_revert_restores_prior_state() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("round_trip")?;
    let store = IndexerStore::new(tmp.path())?;

    handler::apply_block(&store, &first_block())?;
    let state_before = store.get_app_state()?.expect("app state");
    let baker_before = store.get_account(&Address::new(BAKER))?.expect("baker");
    let sender_before = store.get_account(&Address::new(SENDER))?.expect("sender");

    handler::apply_block(
        &store,
        &raw_block(
            2,
            json!([
                [group(&group_hash("End1"), vec![endorsement(BAKER, 2)])],
                [],
                [],
                [group(
                    &group_hash("Mgr1"),
                    vec![
                        reveal(SENDER, 1_000, 1),
                        transaction(SENDER, 1_500, 2, 500_000, DEST),
                    ],
                )],
            ]),
        ),
    )?;
    assert_eq!(4, store.get_app_state()?.expect("app state").next_operation_id);

    // block 2 moved both last-activity levels forward
    let sender_mid = store.get_account(&Address::new(SENDER))?.expect("sender");
    assert_eq!(2, sender_mid.last_level);
    let baker_mid = store.get_account(&Address::new(BAKER))?.expect("baker");
    assert_eq!(2, baker_mid.last_level);

    handler::revert_last_block(&store)?;

    assert_eq!(state_before, store.get_app_state()?.expect("app state"));
    assert_eq!(
        baker_before,
        store.get_account(&Address::new(BAKER))?.expect("baker")
    );
    assert_eq!(
        sender_before,
        store.get_account(&Address::new(SENDER))?.expect("sender")
    );
    assert_eq!(
        1,
        store
            .get_account(&Address::new(SENDER))?
            .expect("sender")
            .last_level
    );
    // the destination only ever existed through the reverted transaction
    assert!(store.get_account(&Address::new(DEST))?.is_none());
    assert!(store.get_operations_at(2)?.is_empty());
    assert!(store.get_block(2)?.is_none());
    Ok(())
}

#[test]
fn reverting_to_genesis_leaves_no_trace() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("genesis")?;
    let store = IndexerStore::new(tmp.path())?;

    handler::apply_block(&store, &first_block())?;
    handler::revert_last_block(&store)?;

    assert_eq!(AppState::default(), store.get_app_state()?.expect("app state"));
    assert!(store.get_account(&Address::new(SENDER))?.is_none());
    assert!(store.get_account(&Address::new(BAKER))?.is_none());
    assert!(store.get_delegates()?.is_empty());
    // the baker's per-cycle row was created on demand by the block credit
    assert!(store.get_baker_cycle(0, &Address::new(BAKER))?.is_none());
    assert!(store.get_cycle(0)?.is_none());
    assert!(store.get_protocol(1)?.is_none());
    assert!(store.get_voting_period(0)?.is_none());
    assert!(store.get_block(1)?.is_none());
    assert!(store.get_operations_at(1)?.is_empty());
    Ok(())
}

#[test]
fn block_must_extend_the_chain() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("continuity")?;
    let store = IndexerStore::new(tmp.path())?;

    assert!(handler::apply_block(&store, &raw_block(2, json!([[], [], [], []]))).is_err());

    handler::apply_block(&store, &first_block())?;
    assert!(handler::apply_block(&store, &raw_block(5, json!([[], [], [], []]))).is_err());
    assert_eq!(1, store.get_app_state()?.expect("app state").level);
    Ok(())
}

#[test]
fn nothing_to_revert_on_empty_store() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("empty_revert")?;
    let store = IndexerStore::new(tmp.path())?;
    assert!(handler::revert_last_block(&store).is_err());
    Ok(())
}
