use super::Protocol;

pub trait ProtocolStore {
    fn get_protocol(&self, version: u32) -> anyhow::Result<Option<Protocol>>;
}
