use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use viewline_core::{
    BadgeMint, EventReceipt, MintReceipt, SettlementError, SettlementGateway, TokenTransfer,
    TransactionId,
};

/// Where and what the gateway settles against
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Base url of the ledger bridge service
    pub base_url: String,
    /// The fungible reward token
    pub token_id: String,
    /// The NFT collection badges are minted into
    pub badge_collection_id: String,
    /// The append-only topic audit events are submitted to
    pub audit_topic_id: String,
}

/// Settles instructions through a ledger bridge service over JSON. The
/// bridge owns account keys, transaction signing, and receipt polling, this
/// client only forwards instructions and interprets the receipts.
pub struct RestLedgerGateway {
    client: Client,
    config: LedgerConfig,
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    token_id: &'a str,
    from: &'a str,
    to: &'a str,
    amount: u64,
    memo: &'a str,
}

#[derive(Debug, Serialize)]
struct MintRequest<'a> {
    collection_id: &'a str,
    recipient: &'a str,
    metadata: &'a str,
    memo: String,
}

#[derive(Debug, Serialize)]
struct TopicMessageRequest {
    message: Value,
}

#[derive(Debug, Deserialize)]
struct TransferReceiptBody {
    transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct MintReceiptBody {
    serial: u64,
    transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct TopicReceiptBody {
    sequence_number: u64,
    transaction_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl RestLedgerGateway {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SettlementError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| SettlementError::Transport(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| SettlementError::Transport(e.to_string()));
        }

        let error: ErrorBody = response.json().await.unwrap_or_default();

        Err(SettlementError::Rejected {
            reason: format!(
                "{} {}",
                error.code.unwrap_or_else(|| status.to_string()),
                error.message.unwrap_or_default()
            )
            .trim()
            .to_string(),
        })
    }
}

#[async_trait]
impl SettlementGateway for RestLedgerGateway {
    async fn transfer_tokens(
        &self,
        transfer: TokenTransfer,
    ) -> Result<TransactionId, SettlementError> {
        debug!(
            "transferring {} from {} to {}",
            transfer.amount, transfer.from, transfer.to
        );

        let receipt: TransferReceiptBody = self
            .post(
                "transfers",
                &TransferRequest {
                    token_id: &self.config.token_id,
                    from: &transfer.from,
                    to: &transfer.to,
                    amount: transfer.amount,
                    memo: &transfer.memo,
                },
            )
            .await?;

        Ok(receipt.transaction_id)
    }

    async fn mint_and_transfer_badge(
        &self,
        mint: BadgeMint,
    ) -> Result<MintReceipt, SettlementError> {
        debug!("minting badge {} for {}", mint.metadata, mint.account_id);

        let result: Result<MintReceiptBody, _> = self
            .post(
                "nft/mints",
                &MintRequest {
                    collection_id: &self.config.badge_collection_id,
                    recipient: &mint.account_id,
                    metadata: &mint.metadata,
                    memo: format!("Achievement: {}", mint.metadata),
                },
            )
            .await;

        match result {
            Ok(receipt) => Ok(MintReceipt {
                serial: receipt.serial,
                transaction_id: receipt.transaction_id,
            }),
            // The bridge reports a failed token association as a rejection
            // with a dedicated code
            Err(SettlementError::Rejected { reason })
                if reason.contains("ASSOCIATION") || reason.contains("NOT_ASSOCIATED") =>
            {
                Err(SettlementError::AssociationFailed {
                    account_id: mint.account_id,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn submit_event(
        &self,
        kind: &str,
        payload: Value,
    ) -> Result<EventReceipt, SettlementError> {
        let path = format!("topics/{}/messages", self.config.audit_topic_id);

        let receipt: TopicReceiptBody = self
            .post(
                &path,
                &TopicMessageRequest {
                    message: json!({
                        "type": kind,
                        "timestamp": Utc::now().timestamp_millis(),
                        "data": payload,
                    }),
                },
            )
            .await?;

        Ok(EventReceipt {
            sequence_number: receipt.sequence_number,
            transaction_id: receipt.transaction_id,
        })
    }
}
