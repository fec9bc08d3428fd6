use super::{BakerCycle, BakingRight, Cycle, DelegatorCycle};
use crate::base::{address::Address, Level};

pub trait CycleStore {
    fn get_cycle(&self, index: u32) -> anyhow::Result<Option<Cycle>>;

    fn get_baking_right(&self, cycle: u32, level: Level, round: u32)
        -> anyhow::Result<Option<Address>>;

    fn get_baking_rights(&self, cycle: u32) -> anyhow::Result<Vec<BakingRight>>;

    fn get_baker_cycle(&self, cycle: u32, baker: &Address) -> anyhow::Result<Option<BakerCycle>>;

    fn get_baker_cycles(&self, cycle: u32) -> anyhow::Result<Vec<BakerCycle>>;

    fn get_delegator_cycles(&self, cycle: u32) -> anyhow::Result<Vec<DelegatorCycle>>;
}
