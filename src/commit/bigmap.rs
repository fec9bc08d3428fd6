//! Big map diff aggregation
//!
//! Diffs ride on applied manager operations. Each one becomes a durable
//! update record carrying the previous value, so reverting a level replays
//! its records backwards and restores every key exactly.

use crate::{
    base::{address::Address, Level},
    cache::BlockContext,
    operation::parse::{BigMapAction, RawBigMapDiff},
};
use serde::{Deserialize, Serialize};

pub trait BigMapStore {
    fn get_bigmap_value(&self, bigmap: u64, key: &str) -> anyhow::Result<Option<String>>;

    /// Update records at `level`, ascending by index
    fn get_bigmap_updates_at(&self, level: Level) -> anyhow::Result<Vec<BigMapUpdate>>;
}

/// Durable record of one applied big map diff
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct BigMapUpdate {
    pub level: Level,
    /// position within the level, assigned in apply order
    pub index: u32,
    pub action: BigMapAction,
    pub bigmap: u64,
    pub key: String,
    pub value: Option<String>,
    /// value before this diff, `None` when the key was absent
    pub prev: Option<String>,
    /// contract whose allocation count an alloc bumped
    pub owner: Option<Address>,
}

/// Current value of a key, seeing writes already staged in this block
fn current_value(ctx: &BlockContext, bigmap: u64, key: &str) -> anyhow::Result<Option<String>> {
    for (map, k, value) in ctx.update.bigmap_values.iter().rev() {
        if *map == bigmap && k == key {
            return Ok(value.clone());
        }
    }
    ctx.store.get_bigmap_value(bigmap, key)
}

pub fn apply_diffs(
    ctx: &mut BlockContext,
    level: Level,
    owner: Option<&Address>,
    diffs: &[RawBigMapDiff],
) -> anyhow::Result<()> {
    for diff in diffs {
        let prev = current_value(ctx, diff.bigmap, &diff.key)?;
        let value = match diff.action {
            BigMapAction::Alloc | BigMapAction::Update => diff.value.clone(),
            BigMapAction::Remove => None,
        };

        if matches!(diff.action, BigMapAction::Alloc) {
            if let Some(owner) = owner {
                ctx.update_account(owner, |a| {
                    if let crate::account::AccountDetails::Contract(info) = &mut a.details {
                        info.bigmaps_count += 1;
                    }
                })?;
            }
        }

        let index = ctx.update.bigmap_updates.len() as u32;
        ctx.update
            .bigmap_values
            .push((diff.bigmap, diff.key.clone(), value.clone()));
        ctx.update.bigmap_updates.push(BigMapUpdate {
            level,
            index,
            action: diff.action,
            bigmap: diff.bigmap,
            key: diff.key.clone(),
            value,
            prev,
            owner: matches!(diff.action, BigMapAction::Alloc)
                .then(|| owner.cloned())
                .flatten(),
        });
    }
    Ok(())
}

/// Replay a level's update records backwards, restoring previous values
pub fn revert_level(ctx: &mut BlockContext, level: Level) -> anyhow::Result<()> {
    let mut records = ctx.store.get_bigmap_updates_at(level)?;
    records.sort_by(|a, b| b.index.cmp(&a.index));

    for record in records {
        ctx.update
            .bigmap_values
            .push((record.bigmap, record.key.clone(), record.prev.clone()));
        if let Some(owner) = &record.owner {
            ctx.update_account(owner, |a| {
                if let crate::account::AccountDetails::Contract(info) = &mut a.details {
                    info.bigmaps_count -= 1;
                }
            })?;
        }
        ctx.update
            .deleted_bigmap_updates
            .push((record.level, record.index));
    }
    Ok(())
}
