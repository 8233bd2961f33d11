use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub type TransactionId = String;
pub type SharedGateway = Arc<dyn SettlementGateway>;

#[derive(Debug, Error)]
pub enum SettlementError {
    /// The recipient could not be associated with the token, which aborts
    /// the mint and transfer
    #[error("token association failed for {account_id}")]
    AssociationFailed { account_id: String },
    /// The ledger processed the instruction and refused it
    #[error("instruction rejected by ledger: {reason}")]
    Rejected { reason: String },
    /// The ledger could not be reached at all
    #[error("ledger unreachable: {0}")]
    Transport(String),
    #[error("settlement timed out")]
    TimedOut,
}

/// An instruction to move tokens between two ledger accounts.
#[derive(Debug, Clone, Serialize)]
pub struct TokenTransfer {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub memo: String,
}

/// An instruction to mint a badge and hand it to an account.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeMint {
    pub account_id: String,
    /// Opaque metadata stamped onto the minted badge
    pub metadata: String,
}

#[derive(Debug, Clone)]
pub struct MintReceipt {
    pub serial: u64,
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone)]
pub struct EventReceipt {
    pub sequence_number: u64,
    pub transaction_id: TransactionId,
}

/// Represents a type that can execute settlement instructions on an external
/// value-transfer ledger.
///
/// Every operation may take ledger-consensus time to finish, and any of them
/// may fail independently. Failures are reported back as [SettlementError],
/// never swallowed.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    async fn transfer_tokens(&self, transfer: TokenTransfer)
        -> Result<TransactionId, SettlementError>;

    /// Mints a badge and transfers it to the account. The gateway is
    /// responsible for ensuring the recipient is associated with the badge
    /// collection first.
    async fn mint_and_transfer_badge(&self, mint: BadgeMint)
        -> Result<MintReceipt, SettlementError>;

    /// Appends an event to the external audit log.
    async fn submit_event(&self, kind: &str, payload: Value)
        -> Result<EventReceipt, SettlementError>;
}

/// How a settlement instruction ended up, as reported to callers.
///
/// A failed settlement never rolls back the state transition that triggered
/// it, so this rides along in responses as a degraded-success indicator.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    Settled { transaction_id: TransactionId },
    Failed { reason: String },
}

impl SettlementOutcome {
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Self::Settled { transaction_id } => Some(transaction_id),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}
