use super::Block;
use crate::base::Level;

pub trait BlockStore {
    fn get_block(&self, level: Level) -> anyhow::Result<Option<Block>>;
}
