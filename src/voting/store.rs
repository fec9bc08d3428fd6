use super::{Proposal, ProposalHash, VotingPeriod};

pub trait VotingStore {
    fn get_proposal(&self, hash: &ProposalHash) -> anyhow::Result<Option<Proposal>>;

    /// All proposals ever recorded (few, scanned at period boundaries)
    fn get_proposals(&self) -> anyhow::Result<Vec<Proposal>>;

    fn get_voting_period(&self, index: u32) -> anyhow::Result<Option<VotingPeriod>>;
}
