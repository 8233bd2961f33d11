use std::time::Duration;

/// The configuration of the coordination core
#[derive(Debug, Clone)]
pub struct Config {
    /// The ledger account rewards are paid from and redemptions are paid to
    pub treasury_account: String,
    /// How many tokens a single rating submission earns before multipliers
    pub rating_base_reward: u64,
    /// How long a settlement call may take before it is treated as failed
    pub settlement_timeout: Duration,
    /// The token symbol used in memos and log lines
    pub token_symbol: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            treasury_account: "0.0.2".to_string(),
            rating_base_reward: 2,
            // Ledger consensus usually finishes within a few seconds
            settlement_timeout: Duration::from_secs(5),
            token_symbol: "VIEW".to_string(),
        }
    }
}
