use async_trait::async_trait;
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    BadgeMint, EventReceipt, MintReceipt, SettlementError, SettlementGateway, TokenTransfer,
    TransactionId,
};

/// An in-process settlement gateway. Instructions settle instantly with
/// deterministic identifiers, which makes it the gateway of choice for tests
/// and for running without a ledger bridge.
#[derive(Default)]
pub struct MemorySettlement {
    failing: AtomicCell<bool>,

    next_transaction: AtomicCell<u64>,
    next_serial: AtomicCell<u64>,
    next_sequence: AtomicCell<u64>,

    transfers: Mutex<Vec<TokenTransfer>>,
    mints: Mutex<Vec<BadgeMint>>,
    events: Mutex<Vec<(String, Value)>>,
}

impl MemorySettlement {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes every subsequent instruction fail, simulating a ledger outage
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing);
    }

    /// Every transfer settled so far
    pub fn transfers(&self) -> Vec<TokenTransfer> {
        self.transfers.lock().clone()
    }

    /// Every badge minted so far
    pub fn mints(&self) -> Vec<BadgeMint> {
        self.mints.lock().clone()
    }

    /// Every submitted audit event as (kind, payload)
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().clone()
    }

    fn next_transaction_id(&self) -> TransactionId {
        format!("memory-tx-{}", self.next_transaction.fetch_add(1) + 1)
    }

    fn check_available(&self) -> Result<(), SettlementError> {
        if self.failing.load() {
            return Err(SettlementError::Transport(
                "simulated ledger outage".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl SettlementGateway for MemorySettlement {
    async fn transfer_tokens(
        &self,
        transfer: TokenTransfer,
    ) -> Result<TransactionId, SettlementError> {
        self.check_available()?;

        self.transfers.lock().push(transfer);
        Ok(self.next_transaction_id())
    }

    async fn mint_and_transfer_badge(
        &self,
        mint: BadgeMint,
    ) -> Result<MintReceipt, SettlementError> {
        self.check_available()?;

        self.mints.lock().push(mint);

        Ok(MintReceipt {
            serial: self.next_serial.fetch_add(1) + 1,
            transaction_id: self.next_transaction_id(),
        })
    }

    async fn submit_event(
        &self,
        kind: &str,
        payload: Value,
    ) -> Result<EventReceipt, SettlementError> {
        self.check_available()?;

        self.events.lock().push((kind.to_string(), payload));

        Ok(EventReceipt {
            sequence_number: self.next_sequence.fetch_add(1) + 1,
            transaction_id: self.next_transaction_id(),
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{SettlementGateway, TokenTransfer};

    use super::MemorySettlement;

    #[tokio::test]
    async fn settles_with_deterministic_ids() {
        let gateway = MemorySettlement::new();

        let transfer = TokenTransfer {
            from: "treasury".to_string(),
            to: "alice".to_string(),
            amount: 2,
            memo: "Reward".to_string(),
        };

        let first = gateway.transfer_tokens(transfer.clone()).await.unwrap();
        let second = gateway.transfer_tokens(transfer).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(gateway.transfers().len(), 2);
    }

    #[tokio::test]
    async fn failing_mode() {
        let gateway = MemorySettlement::new();
        gateway.set_failing(true);

        let transfer = TokenTransfer {
            from: "treasury".to_string(),
            to: "alice".to_string(),
            amount: 2,
            memo: "Reward".to_string(),
        };

        assert!(gateway.transfer_tokens(transfer.clone()).await.is_err());

        gateway.set_failing(false);
        assert!(gateway.transfer_tokens(transfer).await.is_ok());
    }
}
