use super::AppState;

pub trait StateStore {
    /// Get the chain cursor, `None` before the first block is indexed
    fn get_app_state(&self) -> anyhow::Result<Option<AppState>>;
}
