use std::{env, sync::Arc, thread};

use log::{info, warn};
use viewline_core::{
    implementors::MemorySettlement, Config, Coordinator, RedemptionCatalog, SharedGateway,
};
use viewline_impls::{LedgerConfig, RestLedgerGateway};
use viewline_server::{init_logger, run_server, ServerContext};

#[tokio::main]
async fn main() {
    init_logger();

    let mut config = Config::default();

    if let Ok(treasury) = env::var("LEDGER_TREASURY_ACCOUNT") {
        config.treasury_account = treasury;
    }

    let gateway: SharedGateway = match env::var("LEDGER_BASE_URL") {
        Ok(base_url) => {
            info!("Settling against ledger bridge at {}", base_url);

            Arc::new(RestLedgerGateway::new(LedgerConfig {
                base_url,
                token_id: env::var("LEDGER_TOKEN_ID").unwrap_or_default(),
                badge_collection_id: env::var("LEDGER_BADGE_COLLECTION_ID").unwrap_or_default(),
                audit_topic_id: env::var("LEDGER_AUDIT_TOPIC_ID").unwrap_or_default(),
            }))
        }
        Err(_) => {
            warn!("LEDGER_BASE_URL is not set, settling in memory");
            Arc::new(MemorySettlement::new())
        }
    };

    let coordinator = Arc::new(Coordinator::new(
        gateway,
        config,
        RedemptionCatalog::default(),
    ));

    {
        let coordinator = coordinator.clone();

        thread::spawn(move || loop {
            let event = coordinator.wait_for_event();
            info!("{:?}", event);
        });
    }

    info!("Initialized successfully.");

    run_server(ServerContext { coordinator }).await
}
