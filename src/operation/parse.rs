//! Single-step decode of raw operation contents
//!
//! Each raw entry decodes into a ready-to-apply [ParsedContent] or fails.
//! There is no partially-initialized state: a content that decoded is valid
//! for apply. Decoding is pure and may run concurrently across entries.
//!
//! An unrecognized `kind` tag is a fatal fault, operations are never
//! silently skipped.

use crate::{
    base::{address::Address, amount::Amount, Level},
    block::raw::RawContent,
    error::IndexerError,
    operation::{OperationKind, OperationStatus},
    voting::{ProposalHash, Vote},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

//////////////////////
// parsed contents  //
//////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedContent {
    Endorsement {
        delegate: Address,
        slots: u32,
    },
    Preendorsement {
        delegate: Address,
        slots: u32,
    },
    Proposals {
        source: Address,
        period: u32,
        proposals: Vec<ProposalHash>,
    },
    Ballot {
        source: Address,
        period: u32,
        proposal: ProposalHash,
        vote: Vote,
    },
    Activation {
        account: Address,
        amount: Amount,
    },
    DoubleBaking {
        accused_level: Level,
        offender: Address,
    },
    DoubleEndorsing {
        accused_level: Level,
        offender: Address,
    },
    DoublePreendorsing {
        accused_level: Level,
        offender: Address,
    },
    NonceRevelation {
        revealed_level: Level,
    },
    VdfRevelation {
        solution: String,
    },
    DrainDelegate {
        delegate: Address,
        destination: Address,
    },
    Manager(ManagerContent),
}

impl ParsedContent {
    pub fn kind(&self) -> OperationKind {
        use ParsedContent::*;
        match self {
            Endorsement { .. } => OperationKind::Endorsement,
            Preendorsement { .. } => OperationKind::Preendorsement,
            Proposals { .. } => OperationKind::Proposal,
            Ballot { .. } => OperationKind::Ballot,
            Activation { .. } => OperationKind::Activation,
            DoubleBaking { .. } => OperationKind::DoubleBaking,
            DoubleEndorsing { .. } => OperationKind::DoubleEndorsing,
            DoublePreendorsing { .. } => OperationKind::DoublePreendorsing,
            NonceRevelation { .. } => OperationKind::NonceRevelation,
            VdfRevelation { .. } => OperationKind::VdfRevelation,
            DrainDelegate { .. } => OperationKind::DrainDelegate,
            Manager(content) => content.body.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerContent {
    pub source: Address,
    pub fee: Amount,
    pub counter: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
    pub status: OperationStatus,
    pub body: ManagerBody,
    pub internals: Vec<InternalContent>,
    pub bigmap_diffs: Vec<RawBigMapDiff>,
    pub ticket_updates: Vec<RawTicketUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerBody {
    Reveal {
        public_key: String,
    },
    Delegation {
        delegate: Option<Address>,
    },
    Origination {
        balance: Amount,
        contract: Address,
    },
    Transaction {
        amount: Amount,
        destination: Address,
        entrypoint: Option<String>,
    },
    TransferTicket {
        destination: Address,
    },
    SmartRollupOriginate {
        rollup: Address,
        genesis_commitment: String,
    },
    SmartRollupAddMessages {
        rollup: Address,
        messages: u32,
    },
    SmartRollupCement {
        rollup: Address,
        commitment: String,
    },
    SmartRollupPublish {
        rollup: Address,
        commitment: String,
    },
    SmartRollupRefute {
        rollup: Address,
        opponent: Address,
        /// commitment under dispute
        commitment: String,
    },
    SmartRollupTimeout {
        rollup: Address,
        staker1: Address,
        staker2: Address,
        /// staker whose clock ran out, from the result metadata
        loser: Address,
    },
    SmartRollupRecoverBond {
        rollup: Address,
    },
    SmartRollupExecute {
        rollup: Address,
        commitment: String,
    },
}

impl ManagerBody {
    pub fn kind(&self) -> OperationKind {
        use ManagerBody::*;
        match self {
            Reveal { .. } => OperationKind::Reveal,
            Delegation { .. } => OperationKind::Delegation,
            Origination { .. } => OperationKind::Origination,
            Transaction { .. } => OperationKind::Transaction,
            TransferTicket { .. } => OperationKind::TransferTicket,
            SmartRollupOriginate { .. } => OperationKind::SmartRollupOriginate,
            SmartRollupAddMessages { .. } => OperationKind::SmartRollupAddMessages,
            SmartRollupCement { .. } => OperationKind::SmartRollupCement,
            SmartRollupPublish { .. } => OperationKind::SmartRollupPublish,
            SmartRollupRefute { .. } => OperationKind::SmartRollupRefute,
            SmartRollupTimeout { .. } => OperationKind::SmartRollupTimeout,
            SmartRollupRecoverBond { .. } => OperationKind::SmartRollupRecoverBond,
            SmartRollupExecute { .. } => OperationKind::SmartRollupExecute,
        }
    }

    pub fn target(&self) -> Option<&Address> {
        use ManagerBody::*;
        match self {
            Reveal { .. } => None,
            Delegation { delegate } => delegate.as_ref(),
            Origination { contract, .. } => Some(contract),
            Transaction { destination, .. } => Some(destination),
            TransferTicket { destination } => Some(destination),
            SmartRollupOriginate { rollup, .. }
            | SmartRollupAddMessages { rollup, .. }
            | SmartRollupCement { rollup, .. }
            | SmartRollupPublish { rollup, .. }
            | SmartRollupRefute { rollup, .. }
            | SmartRollupTimeout { rollup, .. }
            | SmartRollupRecoverBond { rollup }
            | SmartRollupExecute { rollup, .. } => Some(rollup),
        }
    }
}

/// Internal effect nested inside a manager operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalContent {
    pub source: Address,
    pub status: OperationStatus,
    pub body: InternalBody,
    pub bigmap_diffs: Vec<RawBigMapDiff>,
    pub ticket_updates: Vec<RawTicketUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalBody {
    Transaction {
        amount: Amount,
        destination: Address,
        entrypoint: Option<String>,
    },
    Delegation {
        delegate: Option<Address>,
    },
    Origination {
        balance: Amount,
        contract: Address,
    },
    Event {
        tag: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BigMapAction {
    Alloc,
    Update,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawBigMapDiff {
    pub action: BigMapAction,
    pub bigmap: u64,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawTicketUpdate {
    pub ticketer: Address,
    pub account: Address,
    pub amount: i64,
}

////////////
// decode //
////////////

fn decode<T: serde::de::DeserializeOwned>(kind: &str, body: &Value) -> anyhow::Result<T> {
    serde_json::from_value(body.clone()).map_err(|e| IndexerError::decode(format!("{kind}: {e}")))
}

fn u64_field<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // node RPC encodes counters and limits as decimal strings
    let s = String::deserialize(deserializer)?;
    s.parse::<u64>().map_err(serde::de::Error::custom)
}

#[derive(Deserialize)]
struct RawResult {
    status: String,
}

impl RawResult {
    fn status(&self, kind: &str) -> anyhow::Result<OperationStatus> {
        match self.status.as_str() {
            "applied" => Ok(OperationStatus::Applied),
            "failed" => Ok(OperationStatus::Failed),
            other => Err(IndexerError::decode(format!(
                "{kind}: unexpected status '{other}'"
            ))),
        }
    }
}

#[derive(Deserialize)]
struct RawConsensus {
    delegate: Address,
    slots: u32,
}

#[derive(Deserialize)]
struct RawProposals {
    source: Address,
    period: u32,
    proposals: Vec<ProposalHash>,
}

#[derive(Deserialize)]
struct RawBallot {
    source: Address,
    period: u32,
    proposal: ProposalHash,
    ballot: String,
}

#[derive(Deserialize)]
struct RawActivation {
    pkh: Address,
    balance: Amount,
}

#[derive(Deserialize)]
struct RawDoubleEvidence {
    accused_level: Level,
    offender: Address,
}

#[derive(Deserialize)]
struct RawNonceRevelation {
    level: Level,
}

#[derive(Deserialize)]
struct RawVdfRevelation {
    solution: String,
}

#[derive(Deserialize)]
struct RawDrainDelegate {
    delegate: Address,
    destination: Address,
}

#[derive(Deserialize)]
struct RawManagerCommon {
    source: Address,
    fee: Amount,
    #[serde(deserialize_with = "u64_field")]
    counter: u64,
    #[serde(deserialize_with = "u64_field")]
    gas_limit: u64,
    #[serde(deserialize_with = "u64_field")]
    storage_limit: u64,
    result: RawResult,
    #[serde(default)]
    internal_operations: Vec<RawInternal>,
    #[serde(default)]
    big_map_diffs: Vec<RawBigMapDiff>,
    #[serde(default)]
    ticket_updates: Vec<RawTicketUpdate>,
}

#[derive(Deserialize)]
struct RawInternal {
    kind: String,
    source: Address,
    result: RawResult,
    #[serde(flatten)]
    body: Value,
    #[serde(default)]
    big_map_diffs: Vec<RawBigMapDiff>,
    #[serde(default)]
    ticket_updates: Vec<RawTicketUpdate>,
}

#[derive(Deserialize)]
struct RawReveal {
    public_key: String,
}

#[derive(Deserialize)]
struct RawDelegation {
    #[serde(default)]
    delegate: Option<Address>,
}

#[derive(Deserialize)]
struct RawOrigination {
    balance: Amount,
    contract: Address,
}

#[derive(Deserialize)]
struct RawTransaction {
    amount: Amount,
    destination: Address,
    #[serde(default)]
    entrypoint: Option<String>,
}

#[derive(Deserialize)]
struct RawTransferTicket {
    destination: Address,
}

#[derive(Deserialize)]
struct RawSrOriginate {
    rollup: Address,
    genesis_commitment: String,
}

#[derive(Deserialize)]
struct RawSrAddMessages {
    rollup: Address,
    messages: u32,
}

#[derive(Deserialize)]
struct RawSrCommitment {
    rollup: Address,
    commitment: String,
}

#[derive(Deserialize)]
struct RawSrRefute {
    rollup: Address,
    opponent: Address,
    #[serde(default)]
    commitment: String,
}

#[derive(Deserialize)]
struct RawSrTimeout {
    rollup: Address,
    staker1: Address,
    staker2: Address,
    loser: Address,
}

#[derive(Deserialize)]
struct RawSrRecoverBond {
    rollup: Address,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    tag: String,
}

impl ParsedContent {
    /// Decode one raw content for the given active protocol version.
    pub fn parse(content: &RawContent, version: u32) -> anyhow::Result<Self> {
        let kind = content.kind.as_str();
        let body = &content.body;

        let parsed = match kind {
            "endorsement" => {
                let raw: RawConsensus = decode(kind, body)?;
                Self::Endorsement {
                    delegate: raw.delegate,
                    slots: raw.slots,
                }
            }
            "preendorsement" => {
                let raw: RawConsensus = decode(kind, body)?;
                Self::Preendorsement {
                    delegate: raw.delegate,
                    slots: raw.slots,
                }
            }
            "proposals" => {
                let raw: RawProposals = decode(kind, body)?;
                Self::Proposals {
                    source: raw.source,
                    period: raw.period,
                    proposals: raw.proposals,
                }
            }
            "ballot" => {
                let raw: RawBallot = decode(kind, body)?;
                let vote = match raw.ballot.as_str() {
                    "yay" => Vote::Yay,
                    "nay" => Vote::Nay,
                    "pass" => Vote::Pass,
                    other => {
                        return Err(IndexerError::decode(format!("ballot: unknown vote '{other}'")))
                    }
                };
                Self::Ballot {
                    source: raw.source,
                    period: raw.period,
                    proposal: raw.proposal,
                    vote,
                }
            }
            "activate_account" => {
                let raw: RawActivation = decode(kind, body)?;
                Self::Activation {
                    account: raw.pkh,
                    amount: raw.balance,
                }
            }
            "double_baking_evidence" => {
                let raw: RawDoubleEvidence = decode(kind, body)?;
                Self::DoubleBaking {
                    accused_level: raw.accused_level,
                    offender: raw.offender,
                }
            }
            "double_endorsement_evidence" => {
                let raw: RawDoubleEvidence = decode(kind, body)?;
                Self::DoubleEndorsing {
                    accused_level: raw.accused_level,
                    offender: raw.offender,
                }
            }
            "double_preendorsement_evidence" => {
                let raw: RawDoubleEvidence = decode(kind, body)?;
                Self::DoublePreendorsing {
                    accused_level: raw.accused_level,
                    offender: raw.offender,
                }
            }
            "seed_nonce_revelation" => {
                let raw: RawNonceRevelation = decode(kind, body)?;
                Self::NonceRevelation {
                    revealed_level: raw.level,
                }
            }
            "vdf_revelation" => {
                let raw: RawVdfRevelation = decode(kind, body)?;
                Self::VdfRevelation {
                    solution: raw.solution,
                }
            }
            "drain_delegate" => {
                let raw: RawDrainDelegate = decode(kind, body)?;
                Self::DrainDelegate {
                    delegate: raw.delegate,
                    destination: raw.destination,
                }
            }
            "reveal" | "delegation" | "origination" | "transaction" | "transfer_ticket"
            | "smart_rollup_originate" | "smart_rollup_add_messages" | "smart_rollup_cement"
            | "smart_rollup_publish" | "smart_rollup_refute" | "smart_rollup_timeout"
            | "smart_rollup_recover_bond" | "smart_rollup_execute_outbox_message" => {
                Self::Manager(parse_manager(kind, body)?)
            }
            other => return Err(IndexerError::UnsupportedKind(other.to_string()).into()),
        };

        if parsed.kind().min_version() > version {
            return Err(IndexerError::UnsupportedKind(format!(
                "{kind} (not defined until protocol v{}, active v{version})",
                parsed.kind().min_version()
            ))
            .into());
        }
        Ok(parsed)
    }
}

fn parse_manager(kind: &str, body: &Value) -> anyhow::Result<ManagerContent> {
    let common: RawManagerCommon = decode(kind, body)?;

    let manager_body = match kind {
        "reveal" => {
            let raw: RawReveal = decode(kind, body)?;
            ManagerBody::Reveal {
                public_key: raw.public_key,
            }
        }
        "delegation" => {
            let raw: RawDelegation = decode(kind, body)?;
            ManagerBody::Delegation {
                delegate: raw.delegate,
            }
        }
        "origination" => {
            let raw: RawOrigination = decode(kind, body)?;
            ManagerBody::Origination {
                balance: raw.balance,
                contract: raw.contract,
            }
        }
        "transaction" => {
            let raw: RawTransaction = decode(kind, body)?;
            ManagerBody::Transaction {
                amount: raw.amount,
                destination: raw.destination,
                entrypoint: raw.entrypoint,
            }
        }
        "transfer_ticket" => {
            let raw: RawTransferTicket = decode(kind, body)?;
            ManagerBody::TransferTicket {
                destination: raw.destination,
            }
        }
        "smart_rollup_originate" => {
            let raw: RawSrOriginate = decode(kind, body)?;
            ManagerBody::SmartRollupOriginate {
                rollup: raw.rollup,
                genesis_commitment: raw.genesis_commitment,
            }
        }
        "smart_rollup_add_messages" => {
            let raw: RawSrAddMessages = decode(kind, body)?;
            ManagerBody::SmartRollupAddMessages {
                rollup: raw.rollup,
                messages: raw.messages,
            }
        }
        "smart_rollup_cement" => {
            let raw: RawSrCommitment = decode(kind, body)?;
            ManagerBody::SmartRollupCement {
                rollup: raw.rollup,
                commitment: raw.commitment,
            }
        }
        "smart_rollup_publish" => {
            let raw: RawSrCommitment = decode(kind, body)?;
            ManagerBody::SmartRollupPublish {
                rollup: raw.rollup,
                commitment: raw.commitment,
            }
        }
        "smart_rollup_refute" => {
            let raw: RawSrRefute = decode(kind, body)?;
            ManagerBody::SmartRollupRefute {
                rollup: raw.rollup,
                opponent: raw.opponent,
                commitment: raw.commitment,
            }
        }
        "smart_rollup_timeout" => {
            let raw: RawSrTimeout = decode(kind, body)?;
            ManagerBody::SmartRollupTimeout {
                rollup: raw.rollup,
                staker1: raw.staker1,
                staker2: raw.staker2,
                loser: raw.loser,
            }
        }
        "smart_rollup_recover_bond" => {
            let raw: RawSrRecoverBond = decode(kind, body)?;
            ManagerBody::SmartRollupRecoverBond { rollup: raw.rollup }
        }
        "smart_rollup_execute_outbox_message" => {
            let raw: RawSrCommitment = decode(kind, body)?;
            ManagerBody::SmartRollupExecute {
                rollup: raw.rollup,
                commitment: raw.commitment,
            }
        }
        other => return Err(IndexerError::UnsupportedKind(other.to_string()).into()),
    };

    let mut internals = Vec::with_capacity(common.internal_operations.len());
    for internal in &common.internal_operations {
        internals.push(parse_internal(internal)?);
    }

    Ok(ManagerContent {
        source: common.source,
        fee: common.fee,
        counter: common.counter,
        gas_limit: common.gas_limit,
        storage_limit: common.storage_limit,
        status: common.result.status(kind)?,
        body: manager_body,
        internals,
        bigmap_diffs: common.big_map_diffs,
        ticket_updates: common.ticket_updates,
    })
}

fn parse_internal(raw: &RawInternal) -> anyhow::Result<InternalContent> {
    let kind = raw.kind.as_str();
    let body = match kind {
        "transaction" => {
            let tx: RawTransaction = decode(kind, &raw.body)?;
            InternalBody::Transaction {
                amount: tx.amount,
                destination: tx.destination,
                entrypoint: tx.entrypoint,
            }
        }
        "delegation" => {
            let del: RawDelegation = decode(kind, &raw.body)?;
            InternalBody::Delegation {
                delegate: del.delegate,
            }
        }
        "origination" => {
            let orig: RawOrigination = decode(kind, &raw.body)?;
            InternalBody::Origination {
                balance: orig.balance,
                contract: orig.contract,
            }
        }
        "event" => {
            let event: RawEvent = decode(kind, &raw.body)?;
            InternalBody::Event { tag: event.tag }
        }
        other => {
            return Err(IndexerError::UnsupportedKind(format!("internal {other}")).into());
        }
    };

    Ok(InternalContent {
        source: raw.source.clone(),
        status: raw.result.status(kind)?,
        body,
        bigmap_diffs: raw.big_map_diffs.clone(),
        ticket_updates: raw.ticket_updates.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::ParsedContent;
    use crate::{block::raw::RawContent, error::IndexerError, operation::OperationKind};
    use serde_json::json;

    fn content(value: serde_json::Value) -> RawContent {
        serde_json::from_value(value).expect("raw content")
    }

    #[test]
    fn parses_transaction_with_internals() -> anyhow::Result<()> {
        let raw = content(json!({
            "kind": "transaction",
            "source": "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb",
            "fee": "1000",
            "counter": "7",
            "gas_limit": "1040",
            "storage_limit": "300",
            "amount": "5000000",
            "destination": "KT1BEqzn5Wx8uJrZNvuS9DVHmLvG9td3fDLi",
            "result": { "status": "applied" },
            "internal_operations": [{
                "kind": "event",
                "source": "KT1BEqzn5Wx8uJrZNvuS9DVHmLvG9td3fDLi",
                "type": "mint",
                "result": { "status": "applied" }
            }]
        }));

        let parsed = ParsedContent::parse(&raw, 1)?;
        assert_eq!(OperationKind::Transaction, parsed.kind());

        if let ParsedContent::Manager(m) = parsed {
            assert_eq!(1, m.internals.len());
        } else {
            panic!("expected manager content");
        }
        Ok(())
    }

    #[test]
    fn unknown_kind_is_fatal() {
        let raw = content(json!({ "kind": "bake_cookie" }));
        let err = ParsedContent::parse(&raw, 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexerError>(),
            Some(IndexerError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn version_gated_kind_is_unsupported_on_old_protocol() {
        let raw = content(json!({
            "kind": "smart_rollup_add_messages",
            "source": "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb",
            "fee": "500",
            "counter": "2",
            "gas_limit": "1000",
            "storage_limit": "0",
            "rollup": "sr1Ghq66tYK9y3r8CC1Tf8i8m5nxh8nTvZEf",
            "messages": 3,
            "result": { "status": "applied" }
        }));

        assert!(ParsedContent::parse(&raw, 1).is_err());
        assert!(ParsedContent::parse(&raw, 2).is_ok());
    }

    #[test]
    fn malformed_body_is_decode_fault() {
        let raw = content(json!({ "kind": "endorsement", "slots": "not-a-number" }));
        let err = ParsedContent::parse(&raw, 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexerError>(),
            Some(IndexerError::Decode(_))
        ));
    }
}
