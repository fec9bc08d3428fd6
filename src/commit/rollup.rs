//! Smart rollup operation commits, including refutation game lifecycle
//!
//! A started game takes the id of the refutation operation that opened it,
//! so the game row disappears naturally when that operation is reverted.

use super::{pop_operation, push_operation, stake_holder, track, untrack};
use crate::{
    account::Account,
    base::{address::Address, amount::Amount, op_hash::OpHash},
    block::Block,
    cache::BlockContext,
    error::IndexerError,
    operation::{
        parse::{ManagerBody, ManagerContent},
        ManagerInfo, Operation, OperationKind, OperationPayload, OperationStatus,
    },
    protocol::ProtocolParams,
    rollup::{GameKey, GameResult, RefutationGame},
};

pub(crate) fn apply_rollup(
    ctx: &mut BlockContext,
    block: &Block,
    params: &ProtocolParams,
    hash: &OpHash,
    content: &ManagerContent,
    body: &ManagerBody,
    manager: ManagerInfo,
) -> anyhow::Result<()> {
    let kind = body.kind();
    let source = &content.source;

    match body {
        ManagerBody::SmartRollupOriginate {
            rollup,
            genesis_commitment,
        } => {
            if ctx.try_account(rollup)?.is_some() {
                return Err(IndexerError::invariant(format!(
                    "rollup {rollup} already exists"
                )));
            }
            let mut created = Account::new_rollup(
                rollup.clone(),
                source.clone(),
                genesis_commitment.clone(),
                block.level,
            );
            created.add_op(kind, block.level);
            ctx.put_account(created);

            push_operation(
                ctx,
                block,
                hash,
                kind,
                source.clone(),
                Some(rollup.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::SmartRollupOriginate {
                    manager,
                    rollup: rollup.clone(),
                    genesis_commitment: genesis_commitment.clone(),
                },
            );
        }
        ManagerBody::SmartRollupAddMessages { rollup, messages } => {
            let mut prev_inbox_level = 0;
            ctx.update_account(rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    prev_inbox_level = info.inbox_level;
                    info.inbox_level = block.level;
                }
            })?;
            track(ctx, rollup, kind, block.level)?;

            push_operation(
                ctx,
                block,
                hash,
                kind,
                source.clone(),
                Some(rollup.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::SmartRollupAddMessages {
                    manager,
                    messages: *messages,
                    prev_inbox_level,
                },
            );
        }
        ManagerBody::SmartRollupCement { rollup, commitment } => {
            ctx.update_account(rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    info.cemented_commitments += 1;
                }
            })?;
            track(ctx, rollup, kind, block.level)?;

            push_operation(
                ctx,
                block,
                hash,
                kind,
                source.clone(),
                Some(rollup.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::SmartRollupCement {
                    manager,
                    commitment: commitment.clone(),
                },
            );
        }
        ManagerBody::SmartRollupPublish { rollup, commitment } => {
            let bond = params.smart_rollup_commitment_bond;
            let sender = ctx.account(source)?;
            if sender.balance < bond {
                return Err(IndexerError::invariant(format!(
                    "{source} cannot post commitment bond {bond}"
                )));
            }
            let holder = stake_holder(&sender);
            ctx.update_account(source, |a| a.balance -= bond)?;
            if let Some(holder) = holder {
                ctx.update_account(&holder, |d| {
                    if let Some(info) = d.as_delegate_mut() {
                        info.staking_balance -= bond;
                    }
                })?;
            }
            ctx.update_account(rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    info.total_commitments += 1;
                }
            })?;
            track(ctx, rollup, kind, block.level)?;

            push_operation(
                ctx,
                block,
                hash,
                kind,
                source.clone(),
                Some(rollup.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::SmartRollupPublish {
                    manager,
                    commitment: commitment.clone(),
                    bond,
                },
            );
        }
        ManagerBody::SmartRollupRefute {
            rollup,
            opponent,
            commitment,
        } => {
            let key = GameKey::new(rollup.clone(), source.clone(), opponent.clone());
            let (game_id, started, prev_last_level) = match ctx.game_by_key(&key)? {
                Some(id) => {
                    let mut prev_last_level = 0;
                    ctx.update_game(id, |g| {
                        prev_last_level = g.last_level;
                        g.moves += 1;
                        g.last_level = block.level;
                    })?;
                    (id, false, prev_last_level)
                }
                None => {
                    // the game takes the id of the operation opening it
                    let id = ctx.state.next_operation_id();
                    ctx.put_game(RefutationGame {
                        id,
                        rollup: rollup.clone(),
                        initiator: source.clone(),
                        opponent: opponent.clone(),
                        commitment: commitment.clone(),
                        first_level: block.level,
                        last_level: block.level,
                        moves: 1,
                        result: None,
                    });
                    ctx.update_account(rollup, |a| {
                        if let Some(info) = a.as_rollup_mut() {
                            info.active_games += 1;
                        }
                    })?;
                    (id, true, block.level)
                }
            };
            track(ctx, rollup, kind, block.level)?;
            track(ctx, opponent, kind, block.level)?;

            let payload = OperationPayload::SmartRollupRefute {
                manager,
                game_id,
                started,
                prev_last_level,
            };
            if started {
                // id already allocated above, push the record by hand
                let prev_levels = ctx.take_activity();
                ctx.update.operations.push(Operation {
                    id: game_id,
                    level: block.level,
                    timestamp: block.timestamp,
                    hash: hash.clone(),
                    kind,
                    sender: source.clone(),
                    target: Some(rollup.clone()),
                    initiator: None,
                    status: OperationStatus::Applied,
                    prev_levels,
                    payload,
                });
            } else {
                push_operation(
                    ctx,
                    block,
                    hash,
                    kind,
                    source.clone(),
                    Some(rollup.clone()),
                    None,
                    OperationStatus::Applied,
                    payload,
                );
            }
        }
        ManagerBody::SmartRollupTimeout {
            rollup,
            staker1,
            staker2,
            loser,
        } => {
            let key = GameKey::new(rollup.clone(), staker1.clone(), staker2.clone());
            let game_id = ctx.game_by_key(&key)?.ok_or_else(|| {
                IndexerError::referential(format!("timeout of unknown game on {rollup}"))
            })?;
            let winner = if loser == staker1 { staker2 } else { staker1 };
            let slashed = params.smart_rollup_commitment_bond;
            let reward = Amount(slashed.0 / 2);

            let mut game = ctx.game(game_id)?;
            game.result = Some(if *winner == game.initiator {
                GameResult::InitiatorWon
            } else {
                GameResult::OpponentWon
            });
            ctx.put_game(game);

            credit(ctx, winner, reward)?;
            ctx.update_account(rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    info.active_games -= 1;
                }
            })?;
            track(ctx, rollup, kind, block.level)?;

            push_operation(
                ctx,
                block,
                hash,
                kind,
                source.clone(),
                Some(rollup.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::SmartRollupTimeout {
                    manager,
                    game_id,
                    slashed,
                    reward,
                },
            );
        }
        ManagerBody::SmartRollupRecoverBond { rollup } => {
            let bond = params.smart_rollup_commitment_bond;
            credit(ctx, source, bond)?;
            track(ctx, rollup, kind, block.level)?;

            push_operation(
                ctx,
                block,
                hash,
                kind,
                source.clone(),
                Some(rollup.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::SmartRollupRecoverBond { manager, bond },
            );
        }
        ManagerBody::SmartRollupExecute { rollup, commitment } => {
            track(ctx, rollup, kind, block.level)?;
            push_operation(
                ctx,
                block,
                hash,
                kind,
                source.clone(),
                Some(rollup.clone()),
                None,
                OperationStatus::Applied,
                OperationPayload::SmartRollupExecute {
                    manager,
                    commitment: commitment.clone(),
                },
            );
        }
        _ => return Err(IndexerError::invariant("rollup body expected")),
    }
    Ok(())
}

pub(crate) fn failed_payload(body: &ManagerBody, manager: ManagerInfo) -> OperationPayload {
    match body {
        ManagerBody::SmartRollupOriginate {
            rollup,
            genesis_commitment,
        } => OperationPayload::SmartRollupOriginate {
            manager,
            rollup: rollup.clone(),
            genesis_commitment: genesis_commitment.clone(),
        },
        ManagerBody::SmartRollupAddMessages { messages, .. } => {
            OperationPayload::SmartRollupAddMessages {
                manager,
                messages: *messages,
                prev_inbox_level: 0,
            }
        }
        ManagerBody::SmartRollupCement { commitment, .. } => OperationPayload::SmartRollupCement {
            manager,
            commitment: commitment.clone(),
        },
        ManagerBody::SmartRollupPublish { commitment, .. } => {
            OperationPayload::SmartRollupPublish {
                manager,
                commitment: commitment.clone(),
                bond: Amount::default(),
            }
        }
        ManagerBody::SmartRollupRefute { .. } => OperationPayload::SmartRollupRefute {
            manager,
            game_id: 0,
            started: false,
            prev_last_level: 0,
        },
        ManagerBody::SmartRollupTimeout { .. } => OperationPayload::SmartRollupTimeout {
            manager,
            game_id: 0,
            slashed: Amount::default(),
            reward: Amount::default(),
        },
        ManagerBody::SmartRollupRecoverBond { .. } => OperationPayload::SmartRollupRecoverBond {
            manager,
            bond: Amount::default(),
        },
        ManagerBody::SmartRollupExecute { commitment, .. } => OperationPayload::SmartRollupExecute {
            manager,
            commitment: commitment.clone(),
        },
        _ => unreachable!("rollup body expected"),
    }
}

/// Revert the content effects of an applied rollup operation
pub(crate) fn revert_effects(ctx: &mut BlockContext, op: &Operation) -> anyhow::Result<()> {
    let rollup = op
        .target
        .clone()
        .ok_or_else(|| IndexerError::invariant("rollup operation without target"))?;

    match &op.payload {
        OperationPayload::SmartRollupOriginate { .. } => {
            // created by this operation, nothing else references it anymore
            ctx.remove_account(&rollup);
        }
        OperationPayload::SmartRollupAddMessages {
            prev_inbox_level, ..
        } => {
            let prev = *prev_inbox_level;
            ctx.update_account(&rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    info.inbox_level = prev;
                }
            })?;
            untrack(ctx, &rollup, op.kind, op)?;
        }
        OperationPayload::SmartRollupCement { .. } => {
            ctx.update_account(&rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    info.cemented_commitments -= 1;
                }
            })?;
            untrack(ctx, &rollup, op.kind, op)?;
        }
        OperationPayload::SmartRollupPublish { bond, .. } => {
            debit(ctx, &op.sender, *bond)?;
            ctx.update_account(&rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    info.total_commitments -= 1;
                }
            })?;
            untrack(ctx, &rollup, op.kind, op)?;
        }
        OperationPayload::SmartRollupRefute {
            game_id,
            started,
            prev_last_level,
            ..
        } => {
            let game = ctx.game(*game_id)?;
            let opponent = game.opponent.clone();
            if *started {
                ctx.remove_game(*game_id)?;
                ctx.update_account(&rollup, |a| {
                    if let Some(info) = a.as_rollup_mut() {
                        info.active_games -= 1;
                    }
                })?;
            } else {
                let prev = *prev_last_level;
                ctx.update_game(*game_id, |g| {
                    g.moves -= 1;
                    g.last_level = prev;
                })?;
            }
            untrack(ctx, &opponent, op.kind, op)?;
            untrack(ctx, &rollup, op.kind, op)?;
        }
        OperationPayload::SmartRollupTimeout {
            game_id, reward, ..
        } => {
            let mut game = ctx.game(*game_id)?;
            let winner = match game.result {
                Some(GameResult::InitiatorWon) => game.initiator.clone(),
                Some(GameResult::OpponentWon) | Some(GameResult::Draw) => game.opponent.clone(),
                None => {
                    return Err(IndexerError::invariant("timeout revert of unsettled game"))
                }
            };
            game.result = None;
            ctx.put_game(game);

            debit(ctx, &winner, *reward)?;
            ctx.update_account(&rollup, |a| {
                if let Some(info) = a.as_rollup_mut() {
                    info.active_games += 1;
                }
            })?;
            untrack(ctx, &rollup, op.kind, op)?;
        }
        OperationPayload::SmartRollupRecoverBond { bond, .. } => {
            debit(ctx, &op.sender, *bond)?;
            untrack(ctx, &rollup, op.kind, op)?;
        }
        OperationPayload::SmartRollupExecute { .. } => {
            untrack(ctx, &rollup, op.kind, op)?;
        }
        _ => return Err(IndexerError::invariant("rollup payload expected")),
    }
    Ok(())
}

/// Credit `amount` to a balance, keeping its staking contribution in step
fn credit(ctx: &mut BlockContext, addr: &Address, amount: Amount) -> anyhow::Result<()> {
    let account = ctx.account(addr)?;
    let holder = stake_holder(&account);
    ctx.update_account(addr, |a| a.balance += amount)?;
    if let Some(holder) = holder {
        ctx.update_account(&holder, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance += amount;
            }
        })?;
    }
    Ok(())
}

fn debit(ctx: &mut BlockContext, addr: &Address, amount: Amount) -> anyhow::Result<()> {
    let account = ctx.account(addr)?;
    let holder = stake_holder(&account);
    ctx.update_account(addr, |a| a.balance -= amount)?;
    if let Some(holder) = holder {
        ctx.update_account(&holder, |d| {
            if let Some(info) = d.as_delegate_mut() {
                info.staking_balance -= amount;
            }
        })?;
    }
    Ok(())
}
