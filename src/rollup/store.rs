use super::{GameKey, RefutationGame};

pub trait RollupStore {
    fn get_game(&self, id: u64) -> anyhow::Result<Option<RefutationGame>>;

    /// Secondary index: the participant-symmetric key of an ongoing game
    fn get_game_id(&self, key: &GameKey) -> anyhow::Result<Option<u64>>;
}
