use super::{fixed_keys::FixedKeys, IndexerStore};
use crate::state::{store::StateStore, AppState};
use log::trace;

impl StateStore for IndexerStore {
    fn get_app_state(&self) -> anyhow::Result<Option<AppState>> {
        trace!("getting app state");
        Ok(self
            .database
            .get(Self::APP_STATE_KEY)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }
}
