//! The simulation engine: a periodic, guard-protected tick that advances
//! the economy by generating tasks, assigning them, resolving outcomes,
//! settling funds, updating reputation, and rebuilding the leaderboard.

pub mod completion;
pub mod config;
pub mod orchestrator;
pub mod scheduler;

pub use completion::{CompletionProcessor, CompletionStats};
pub use config::EngineConfig;
pub use orchestrator::TickOrchestrator;
pub use scheduler::{TickPermit, TickScheduler};

use std::sync::Arc;

use tokio::sync::watch;

use agora_assignment::AutoAssigner;
use agora_generator::TaskGenerator;
use agora_leaderboard::LeaderboardRecomputer;
use agora_ledger::FundsLedger;
use agora_reputation::ReputationTracker;
use agora_store::MemoryStore;
use agora_types::Clock;

/// Wire a full engine over one shared store. The returned sender flips
/// the engine into its shutting-down state.
pub fn build_engine(
    store: Arc<MemoryStore>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
) -> (TickOrchestrator, watch::Sender<bool>) {
    let ledger = FundsLedger::new(store.clone());
    let tracker = ReputationTracker::new(store.clone());
    let generator = TaskGenerator::new(store.clone(), store.clone());
    let assigner = AutoAssigner::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        ledger.clone(),
    );
    let completion = CompletionProcessor::new(
        store.clone(),
        store.clone(),
        store.clone(),
        ledger,
        tracker.clone(),
        store.clone(),
    );
    let leaderboard = LeaderboardRecomputer::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = TickOrchestrator::new(
        store.clone(),
        store.clone(),
        store,
        generator,
        assigner,
        completion,
        tracker,
        leaderboard,
        config,
        clock,
        shutdown_rx,
    );
    (orchestrator, shutdown_tx)
}
