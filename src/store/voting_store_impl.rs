use super::{column_families::ColumnFamilyHelpers, to_be_bytes, IndexerStore};
use crate::voting::{store::VotingStore, Proposal, ProposalHash, VotingPeriod};
use log::trace;

impl VotingStore for IndexerStore {
    fn get_proposal(&self, hash: &ProposalHash) -> anyhow::Result<Option<Proposal>> {
        trace!("getting proposal {}", hash.0);
        Ok(self
            .database
            .get_cf(self.proposals_cf(), hash.0.as_bytes())?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }

    fn get_proposals(&self) -> anyhow::Result<Vec<Proposal>> {
        trace!("getting proposals");
        let mut proposals = vec![];
        for item in self
            .database
            .iterator_cf(self.proposals_cf(), speedb::IteratorMode::Start)
        {
            let (_, value) = item?;
            proposals.push(serde_json::from_slice(&value)?);
        }
        Ok(proposals)
    }

    fn get_voting_period(&self, index: u32) -> anyhow::Result<Option<VotingPeriod>> {
        trace!("getting voting period {index}");
        Ok(self
            .database
            .get_cf(self.voting_periods_cf(), to_be_bytes(index))?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }
}
