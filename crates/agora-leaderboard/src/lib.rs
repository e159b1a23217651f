//! Leaderboard recomputation: a full rebuild of the denormalized ranking
//! cache from a snapshot of active agents with wallet and reputation.
//! Reads source tables, writes only its own cache.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_store::{AgentStore, LeaderboardStore, ReputationStore, WalletStore};
use agora_types::{
    Agent, AgentStatus, LeaderboardEntry, ReputationScore, Result, Wallet,
};

#[derive(Clone)]
pub struct LeaderboardRecomputer {
    agents: Arc<dyn AgentStore>,
    wallets: Arc<dyn WalletStore>,
    reputations: Arc<dyn ReputationStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
}

struct Row {
    agent: Agent,
    wallet: Wallet,
    score: ReputationScore,
}

impl LeaderboardRecomputer {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        wallets: Arc<dyn WalletStore>,
        reputations: Arc<dyn ReputationStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
    ) -> Self {
        Self {
            agents,
            wallets,
            reputations,
            leaderboard,
        }
    }

    /// Rebuild the cache. Agents without both a wallet and a reputation
    /// record are excluded; stale entries are deleted in the same pass.
    /// Returns the number of entries written.
    pub async fn rebuild(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut rows = Vec::new();
        for agent in self.agents.list_agents_by_status(AgentStatus::Active).await? {
            let Some(wallet) = self.wallets.get_wallet(agent.id).await? else {
                continue;
            };
            let Some(score) = self.reputations.get_reputation(agent.id).await? else {
                continue;
            };
            rows.push(Row {
                agent,
                wallet,
                score,
            });
        }

        let rank_earnings = dense_ranks(&rows, |a, b| {
            b.wallet.total_earned.cmp(&a.wallet.total_earned)
        });
        let rank_reliability = dense_ranks(&rows, |a, b| {
            b.score.reliability.cmp(&a.score.reliability)
        });
        let rank_longevity = dense_ranks(&rows, |a, b| {
            a.agent.created_at.cmp(&b.agent.created_at)
        });
        // Zero-attempt agents sort strictly below anyone with a record,
        // even an all-failure one.
        let rank_success_rate = dense_ranks(&rows, |a, b| {
            let key = |r: &Row| (r.score.attempted() > 0, r.score.success_rate());
            key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal)
        });

        let live: Vec<Uuid> = rows.iter().map(|r| r.agent.id).collect();
        for row in &rows {
            let id = row.agent.id;
            let entry = LeaderboardEntry {
                agent_id: id,
                name: row.agent.name.clone(),
                role: row.agent.role,
                tier: row.score.tier,
                rank_earnings: rank_earnings[&id],
                rank_reliability: rank_reliability[&id],
                rank_longevity: rank_longevity[&id],
                rank_success_rate: rank_success_rate[&id],
                total_earned: row.wallet.total_earned,
                reliability: row.score.reliability,
                success_rate: row.score.success_rate(),
                computed_at: now,
            };
            self.leaderboard.upsert_entry(entry).await?;
        }

        // Drop entries for agents no longer in the snapshot.
        for stale in self.leaderboard.list_entries().await? {
            if !live.contains(&stale.agent_id) {
                self.leaderboard.delete_entry(stale.agent_id).await?;
            }
        }

        tracing::info!(entries = rows.len(), "leaderboard rebuilt");
        Ok(rows.len())
    }
}

/// Assign unique ranks 1..=N under `cmp`, breaking ties by agent id so
/// the result is a dense permutation with no duplicates or gaps.
fn dense_ranks(
    rows: &[Row],
    cmp: impl Fn(&Row, &Row) -> Ordering,
) -> HashMap<Uuid, u32> {
    let mut order: Vec<&Row> = rows.iter().collect();
    order.sort_by(|a, b| cmp(a, b).then_with(|| a.agent.id.cmp(&b.agent.id)));
    order
        .iter()
        .enumerate()
        .map(|(i, row)| (row.agent.id, i as u32 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::MemoryStore;
    use agora_types::{AgentRole, LeaderboardMetric};

    async fn add_agent(
        store: &Arc<MemoryStore>,
        earned: i64,
        reliability: u32,
        completed: u64,
        failed: u64,
    ) -> Uuid {
        let agent = Agent::new("agent", AgentRole::Generalist);
        let id = agent.id;
        store.insert_agent(agent).await.unwrap();
        let mut wallet = Wallet::new(id);
        wallet.total_earned = earned;
        store.insert_wallet(wallet).await.unwrap();
        let mut score = ReputationScore::new(id);
        score.reliability = reliability;
        score.tasks_completed = completed;
        score.tasks_failed = failed;
        score.recompute();
        store.insert_reputation(score).await.unwrap();
        id
    }

    fn recomputer(store: &Arc<MemoryStore>) -> LeaderboardRecomputer {
        LeaderboardRecomputer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        )
    }

    #[tokio::test]
    async fn test_ranks_are_dense_permutations() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            add_agent(&store, i * 100, 400 + (i as u32) * 50, i as u64, 1).await;
        }
        let written = recomputer(&store).rebuild(Utc::now()).await.unwrap();
        assert_eq!(written, 5);

        let entries = store.list_entries().await.unwrap();
        for metric in [
            LeaderboardMetric::Earnings,
            LeaderboardMetric::Reliability,
            LeaderboardMetric::Longevity,
            LeaderboardMetric::SuccessRate,
        ] {
            let mut ranks: Vec<u32> = entries.iter().map(|e| e.rank_for(metric)).collect();
            ranks.sort_unstable();
            assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        }
    }

    #[tokio::test]
    async fn test_top_earner_ranked_first() {
        let store = Arc::new(MemoryStore::new());
        add_agent(&store, 100, 500, 1, 0).await;
        let rich = add_agent(&store, 9000, 500, 1, 0).await;
        recomputer(&store).rebuild(Utc::now()).await.unwrap();

        let entry = store.get_entry(rich).await.unwrap().unwrap();
        assert_eq!(entry.rank_earnings, 1);
    }

    #[tokio::test]
    async fn test_zero_attempt_agents_rank_below_all_failures() {
        let store = Arc::new(MemoryStore::new());
        let fresh = add_agent(&store, 0, 500, 0, 0).await;
        let veteran = add_agent(&store, 0, 500, 0, 5).await; // 0-of-5
        recomputer(&store).rebuild(Utc::now()).await.unwrap();

        let fresh = store.get_entry(fresh).await.unwrap().unwrap();
        let veteran = store.get_entry(veteran).await.unwrap().unwrap();
        assert_eq!(veteran.rank_success_rate, 1);
        assert_eq!(fresh.rank_success_rate, 2);
    }

    #[tokio::test]
    async fn test_agents_missing_wallet_excluded() {
        let store = Arc::new(MemoryStore::new());
        add_agent(&store, 100, 500, 1, 0).await;
        // Agent with no wallet or reputation record.
        store
            .insert_agent(Agent::new("bare", AgentRole::Analyst))
            .await
            .unwrap();

        let written = recomputer(&store).rebuild(Utc::now()).await.unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_stale_entries_deleted() {
        let store = Arc::new(MemoryStore::new());
        let a = add_agent(&store, 100, 500, 1, 0).await;
        add_agent(&store, 200, 500, 1, 0).await;
        recomputer(&store).rebuild(Utc::now()).await.unwrap();
        assert_eq!(store.list_entries().await.unwrap().len(), 2);

        store.archive_agent(a).await.unwrap();
        recomputer(&store).rebuild(Utc::now()).await.unwrap();
        let entries = store.list_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(store.get_entry(a).await.unwrap().is_none());
    }
}
