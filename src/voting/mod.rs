//! Governance state: proposals, ballots, voting periods

pub mod store;

use crate::{
    base::{address::Address, Level},
    constants::PROPOSAL_HASH_LEN,
};
use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Default, Hash, Serialize, Deserialize)]
pub struct ProposalHash(pub String);

impl ProposalHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }
}

impl std::str::FromStr for ProposalHash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == PROPOSAL_HASH_LEN && s.starts_with('P') {
            Ok(Self(s.to_string()))
        } else {
            bail!("Invalid proposal hash: {s}")
        }
    }
}

impl std::fmt::Display for ProposalHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Vote {
    Yay,
    Nay,
    Pass,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum PeriodKind {
    Proposal,
    Exploration,
    Promotion,
}

impl PeriodKind {
    pub fn next(&self) -> Self {
        match self {
            Self::Proposal => Self::Exploration,
            Self::Exploration => Self::Promotion,
            Self::Promotion => Self::Proposal,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum PeriodStatus {
    Active,
    NoWinner,
    Accepted,
    Rejected,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VotingPeriod {
    pub index: u32,
    pub kind: PeriodKind,
    pub first_level: Level,
    pub last_level: Level,
    // proposal-period tally
    pub upvotes: u32,
    // ballot-period tallies
    pub yay: u32,
    pub nay: u32,
    pub pass: u32,
    pub status: PeriodStatus,
    pub winner: Option<ProposalHash>,
}

impl VotingPeriod {
    pub fn new(index: u32, kind: PeriodKind, first_level: Level, length: u32) -> Self {
        Self {
            index,
            kind,
            first_level,
            last_level: first_level + length - 1,
            upvotes: 0,
            yay: 0,
            nay: 0,
            pass: 0,
            status: PeriodStatus::Active,
            winner: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    Accepted,
    Rejected,
}

/// Created by the first proposal operation naming the hash, erased by the
/// revert that takes its upvotes back to zero.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub hash: ProposalHash,
    pub initiator: Address,
    pub period: u32,
    pub first_level: Level,
    pub upvotes: u32,
    pub status: ProposalStatus,
}
