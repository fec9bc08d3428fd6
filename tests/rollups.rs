//! Refutation game lifecycle across whole blocks

use dpos_indexer::{
    account::{store::AccountStore, AccountDetails},
    base::{address::Address, amount::Amount},
    block::raw::RawBlock,
    handler,
    rollup::{store::RollupStore, GameKey, GameResult},
    state::store::StateStore,
    store::IndexerStore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

const BAKER: &str = "tz1gg5bjopPcr9agjamyu9BbXKLibNc2rbAq";
const INITIATOR: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";
const OPPONENT: &str = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx";
const ROLLUP: &str = "sr1Ghq66tYK9y3r8CC1Tf8i8m5nxh8nTvZEf";

/// Enough to post the 10k-token commitment bond and pay fees
const FUND: u64 = 20_000_000_000;
const FEE: u64 = 1_000;

// node operation hashes are 51 base58 characters
fn group_hash(tag: &str) -> String {
    format!("oo{tag:1<49}")
}

fn raw_block(level: u32, manager_group: Vec<Value>) -> RawBlock {
    RawBlock::from_value(json!({
        "level": level,
        "hash": format!("BL{level}"),
        "timestamp": 1_700_000_000u32 + level,
        "baker": BAKER,
        "protocol": 2,
        "operations": [[], [], [], [json!({
            "hash": group_hash(&format!("Mgr{level}")),
            "contents": manager_group,
        })]],
    }))
    .expect("raw block")
}

fn manager(kind: &str, source: &str, counter: u64, body: Value) -> Value {
    let mut content = json!({
        "kind": kind,
        "source": source,
        "fee": FEE.to_string(),
        "counter": counter.to_string(),
        "gas_limit": "10000",
        "storage_limit": "0",
        "result": { "status": "applied" },
    });
    content
        .as_object_mut()
        .expect("content object")
        .extend(body.as_object().expect("body object").clone());
    content
}

fn funded_store(tmp: &TempDir) -> anyhow::Result<IndexerStore> {
    let store = IndexerStore::new(tmp.path())?;
    let activations = RawBlock::from_value(json!({
        "level": 1,
        "hash": "BL1",
        "timestamp": 1_700_000_001u32,
        "baker": BAKER,
        "protocol": 2,
        "operations": [[], [], [json!({
            "hash": group_hash("Act"),
            "contents": [
                { "kind": "activate_account", "pkh": INITIATOR, "balance": FUND.to_string() },
                { "kind": "activate_account", "pkh": OPPONENT, "balance": FUND.to_string() },
            ],
        })], []],
    }))
    .expect("raw block");
    handler::apply_block(&store, &activations)?;
    Ok(store)
}

#[test]
fn game_opens_settles_and_reverts() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("refutation")?;
    let store = funded_store(&tmp)?;

    handler::apply_block(
        &store,
        &raw_block(2, vec![manager(
            "smart_rollup_originate",
            INITIATOR,
            1,
            json!({ "rollup": ROLLUP, "genesis_commitment": "src12genesis" }),
        )]),
    )?;
    handler::apply_block(
        &store,
        &raw_block(3, vec![
            manager(
                "smart_rollup_publish",
                INITIATOR,
                2,
                json!({ "rollup": ROLLUP, "commitment": "src12good" }),
            ),
            manager(
                "smart_rollup_publish",
                OPPONENT,
                1,
                json!({ "rollup": ROLLUP, "commitment": "src12bad" }),
            ),
        ]),
    )?;
    handler::apply_block(
        &store,
        &raw_block(4, vec![manager(
            "smart_rollup_refute",
            INITIATOR,
            3,
            json!({ "rollup": ROLLUP, "opponent": OPPONENT, "commitment": "src12bad" }),
        )]),
    )?;

    let key = GameKey::new(
        Address::new(ROLLUP),
        Address::new(INITIATOR),
        Address::new(OPPONENT),
    );
    let game_id = store.get_game_id(&key)?.expect("ongoing game");
    let rollup = store.get_account(&Address::new(ROLLUP))?.expect("rollup");
    let AccountDetails::SmartRollup(info) = &rollup.details else {
        panic!("expected rollup account");
    };
    assert_eq!(1, info.active_games);

    handler::apply_block(
        &store,
        &raw_block(5, vec![manager(
            "smart_rollup_timeout",
            INITIATOR,
            4,
            json!({
                "rollup": ROLLUP,
                "staker1": INITIATOR,
                "staker2": OPPONENT,
                "loser": OPPONENT,
            }),
        )]),
    )?;

    // settled: the symmetric index no longer resolves, the winner holds
    // half the forfeited bond
    assert!(store.get_game_id(&key)?.is_none());
    let game = store.get_game(game_id)?.expect("game row");
    assert_eq!(Some(GameResult::InitiatorWon), game.result);
    let initiator = store.get_account(&Address::new(INITIATOR))?.expect("initiator");
    assert_eq!(
        Amount(FUND - 4 * FEE - 10_000_000_000 + 5_000_000_000),
        initiator.balance
    );

    // reverting the timeout reopens the game and takes the reward back
    handler::revert_last_block(&store)?;
    assert_eq!(Some(game_id), store.get_game_id(&key)?);
    assert_eq!(None, store.get_game(game_id)?.expect("game row").result);
    let initiator = store.get_account(&Address::new(INITIATOR))?.expect("initiator");
    assert_eq!(Amount(FUND - 3 * FEE - 10_000_000_000), initiator.balance);

    // reverting the refutation removes the game entirely
    let ids_before = store.get_app_state()?.expect("app state").next_operation_id;
    handler::revert_last_block(&store)?;
    assert!(store.get_game(game_id)?.is_none());
    assert!(store.get_game_id(&key)?.is_none());
    assert_eq!(
        ids_before - 1,
        store.get_app_state()?.expect("app state").next_operation_id
    );
    Ok(())
}

#[test]
fn bond_returns_with_recover_and_with_revert() -> anyhow::Result<()> {
    let tmp = TempDir::with_prefix("bond")?;
    let store = funded_store(&tmp)?;

    handler::apply_block(
        &store,
        &raw_block(2, vec![
            manager(
                "smart_rollup_originate",
                INITIATOR,
                1,
                json!({ "rollup": ROLLUP, "genesis_commitment": "src12genesis" }),
            ),
            manager(
                "smart_rollup_publish",
                INITIATOR,
                2,
                json!({ "rollup": ROLLUP, "commitment": "src12good" }),
            ),
        ]),
    )?;
    let initiator = store.get_account(&Address::new(INITIATOR))?.expect("initiator");
    assert_eq!(Amount(FUND - 2 * FEE - 10_000_000_000), initiator.balance);

    handler::apply_block(
        &store,
        &raw_block(3, vec![manager(
            "smart_rollup_recover_bond",
            INITIATOR,
            3,
            json!({ "rollup": ROLLUP }),
        )]),
    )?;
    let initiator = store.get_account(&Address::new(INITIATOR))?.expect("initiator");
    assert_eq!(Amount(FUND - 3 * FEE), initiator.balance);

    handler::revert_last_block(&store)?;
    let initiator = store.get_account(&Address::new(INITIATOR))?.expect("initiator");
    assert_eq!(Amount(FUND - 2 * FEE - 10_000_000_000), initiator.balance);
    Ok(())
}
