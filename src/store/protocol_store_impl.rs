use super::{column_families::ColumnFamilyHelpers, to_be_bytes, IndexerStore};
use crate::protocol::{store::ProtocolStore, Protocol};
use log::trace;

impl ProtocolStore for IndexerStore {
    fn get_protocol(&self, version: u32) -> anyhow::Result<Option<Protocol>> {
        trace!("getting protocol v{version}");
        Ok(self
            .database
            .get_cf(self.protocols_cf(), to_be_bytes(version))?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }
}
