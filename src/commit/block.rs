//! Block baker crediting
//!
//! The baker freezes a security deposit and the block reward; both thaw
//! `preserved_cycles` later (see [super::cycles]).

use crate::{
    account::{AccountDetails, DelegateInfo},
    block::Block,
    cache::BlockContext,
    protocol::ProtocolParams,
};

/// Credit the block baker. A baker seen before any registering delegation
/// (bootstrap bakers) is registered on first sight.
pub fn apply(
    ctx: &mut BlockContext,
    block: &mut Block,
    params: &ProtocolParams,
) -> anyhow::Result<()> {
    let mut baker = ctx.account_or_create(&block.baker, block.level)?;
    block.baker_prev_level = baker.last_level;
    if !baker.is_delegate() {
        baker.details = AccountDetails::Delegate(DelegateInfo {
            staking_balance: baker.balance,
            active: true,
            activation_level: block.level,
            ..DelegateInfo::default()
        });
        baker.delegate = None;
        ctx.update.delegates_added.push(block.baker.clone());
    }

    let info = baker
        .as_delegate_mut()
        .unwrap_or_else(|| unreachable!("baker registered above"));
    info.frozen_deposits += params.block_deposit;
    info.frozen_rewards += block.reward;
    info.blocks_count += 1;
    baker.last_level = block.level;
    ctx.put_account(baker);

    ctx.update_baker_cycle(block.cycle, &block.baker, |bc| {
        bc.blocks += 1;
        bc.block_rewards += block.reward;
        bc.deposits += params.block_deposit;
    })?;
    Ok(())
}

pub fn revert(ctx: &mut BlockContext, block: &Block, params: &ProtocolParams) -> anyhow::Result<()> {
    let mut baker = ctx.account(&block.baker)?;
    let mut unregister = false;
    if let Some(info) = baker.as_delegate_mut() {
        info.frozen_deposits -= params.block_deposit;
        info.frozen_rewards -= block.reward;
        info.blocks_count -= 1;
        // undo a first-sight registration made by this very block
        unregister = info.activation_level == block.level
            && info.blocks_count == 0
            && info.delegators_count == 0;
    }
    if unregister {
        baker.details = AccountDetails::User;
        ctx.update.delegates_removed.push(block.baker.clone());
    }
    baker.last_level = block.baker_prev_level;
    let erasable = baker.is_erasable() && unregister;
    ctx.put_account(baker);
    if erasable {
        ctx.remove_account(&block.baker);
    }

    ctx.update_baker_cycle(block.cycle, &block.baker, |bc| {
        bc.blocks -= 1;
        bc.block_rewards -= block.reward;
        bc.deposits -= params.block_deposit;
    })?;
    ctx.update.deleted_blocks.push(block.level);
    Ok(())
}
