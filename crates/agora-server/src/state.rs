use std::sync::Arc;

use tokio::sync::watch;

use agora_engine::{EngineConfig, TickOrchestrator, build_engine};
use agora_ledger::FundsLedger;
use agora_store::{MemoryStore, WalletStore};
use agora_types::Clock;

/// Shared handles for the HTTP surface. Everything hangs off the one
/// `MemoryStore`; the ledger is the only funds entry point the handlers
/// are allowed to touch.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub engine: Arc<TickOrchestrator>,
    pub ledger: FundsLedger,
    pub shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (engine, shutdown) = build_engine(store.clone(), config, clock);
        let ledger = FundsLedger::new(store.clone() as Arc<dyn WalletStore>);

        Self {
            store,
            engine: Arc::new(engine),
            ledger,
            shutdown,
        }
    }
}
