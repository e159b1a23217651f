//! Reputation tracking: applies task outcomes to the per-agent score
//! record, derives tiers from the overall score, and decays inactive
//! agents.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use agora_resolver::reputation_delta;
use agora_store::ReputationStore;
use agora_types::{AgoraError, ReputationScore, Result, Tier};

/// What an outcome application did, so the orchestrator can emit the
/// matching activity events.
#[derive(Debug, Clone)]
pub struct OutcomeApplied {
    pub score: ReputationScore,
    /// `(old, new)` when the tier moved.
    pub tier_changed: Option<(Tier, Tier)>,
    /// The new streak landed on a positive multiple of 5.
    pub streak_bonus: bool,
}

/// Learning weight (x10) for blending observed quality into the quality
/// component: new = 0.8*old + 0.2*observed.
const QUALITY_BLEND_TENTHS: u32 = 2;
const SPEED_GAIN: u32 = 2;
const SPEED_LOSS: u32 = 5;

#[derive(Clone)]
pub struct ReputationTracker {
    store: Arc<dyn ReputationStore>,
}

impl ReputationTracker {
    pub fn new(store: Arc<dyn ReputationStore>) -> Self {
        Self { store }
    }

    async fn score(&self, agent_id: Uuid) -> Result<ReputationScore> {
        self.store
            .get_reputation(agent_id)
            .await?
            .ok_or(AgoraError::ReputationNotFound(agent_id))
    }

    /// Apply a resolved task outcome: move the components, recompute
    /// overall and tier, update counters and streaks, persist.
    pub async fn apply_outcome(
        &self,
        agent_id: Uuid,
        _task_id: Uuid,
        success: bool,
        difficulty: u8,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<OutcomeApplied> {
        let mut score = self.score(agent_id).await?;
        let old_tier = score.tier;

        let new_streak = if success { score.current_streak + 1 } else { 0 };
        let delta = reputation_delta(success, difficulty, quality, new_streak);

        if success {
            score.reliability =
                (score.reliability + delta as u32).min(ReputationScore::MAX_COMPONENT);
            // Blend quality toward the observation (0..100 scaled to 0..1000).
            let observed = u32::from(quality) * 10;
            score.quality = ((10 - QUALITY_BLEND_TENTHS) * score.quality
                + QUALITY_BLEND_TENTHS * observed)
                / 10;
            score.speed = (score.speed + SPEED_GAIN).min(ReputationScore::MAX_COMPONENT);
            score.tasks_completed += 1;
            score.current_streak = new_streak;
            score.longest_streak = score.longest_streak.max(new_streak);
        } else {
            score.reliability = score.reliability.saturating_sub(delta.unsigned_abs());
            score.speed = score.speed.saturating_sub(SPEED_LOSS);
            score.tasks_failed += 1;
            score.current_streak = 0;
        }

        score.last_active_at = now;
        score.recompute();
        self.store.update_reputation(score.clone()).await?;

        let tier_changed = (score.tier != old_tier).then_some((old_tier, score.tier));
        let streak_bonus = success && new_streak > 0 && new_streak % 5 == 0;
        if let Some((old, new)) = tier_changed {
            tracing::info!(%agent_id, ?old, ?new, "tier changed");
        }

        Ok(OutcomeApplied {
            score,
            tier_changed,
            streak_bonus,
        })
    }

    /// Periodic maintenance: lower every component of agents inactive
    /// beyond `threshold`, floored at `floor`. Returns how many agents
    /// were decayed.
    pub async fn apply_inactivity_decay(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
        decay: u32,
        floor: u32,
    ) -> Result<usize> {
        let mut decayed = 0;
        for mut score in self.store.list_reputations().await? {
            if now - score.last_active_at < threshold {
                continue;
            }
            let before = (score.reliability, score.quality, score.speed);
            score.reliability = score.reliability.saturating_sub(decay).max(floor.min(before.0));
            score.quality = score.quality.saturating_sub(decay).max(floor.min(before.1));
            score.speed = score.speed.saturating_sub(decay).max(floor.min(before.2));
            if (score.reliability, score.quality, score.speed) == before {
                continue;
            }
            score.recompute();
            self.store.update_reputation(score).await?;
            decayed += 1;
        }
        if decayed > 0 {
            tracing::info!(decayed, "inactivity decay applied");
        }
        Ok(decayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::MemoryStore;

    async fn setup() -> (ReputationTracker, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let agent = Uuid::new_v4();
        store
            .insert_reputation(ReputationScore::new(agent))
            .await
            .unwrap();
        (ReputationTracker::new(store.clone()), store, agent)
    }

    #[tokio::test]
    async fn test_success_raises_reliability_and_streak() {
        let (tracker, _store, agent) = setup().await;
        let applied = tracker
            .apply_outcome(agent, Uuid::new_v4(), true, 3, 80, Utc::now())
            .await
            .unwrap();
        // delta = 5 + 3*3 + 2 = 16 on top of the initial 500.
        assert_eq!(applied.score.reliability, 516);
        assert_eq!(applied.score.current_streak, 1);
        assert_eq!(applied.score.tasks_completed, 1);
        assert!(!applied.streak_bonus);
    }

    #[tokio::test]
    async fn test_failure_resets_streak() {
        let (tracker, _store, agent) = setup().await;
        for _ in 0..3 {
            tracker
                .apply_outcome(agent, Uuid::new_v4(), true, 1, 50, Utc::now())
                .await
                .unwrap();
        }
        let applied = tracker
            .apply_outcome(agent, Uuid::new_v4(), false, 2, 0, Utc::now())
            .await
            .unwrap();
        assert_eq!(applied.score.current_streak, 0);
        assert_eq!(applied.score.longest_streak, 3);
        assert_eq!(applied.score.tasks_failed, 1);
    }

    #[tokio::test]
    async fn test_streak_bonus_on_fifth_success() {
        let (tracker, _store, agent) = setup().await;
        let mut last = None;
        for _ in 0..5 {
            last = Some(
                tracker
                    .apply_outcome(agent, Uuid::new_v4(), true, 1, 50, Utc::now())
                    .await
                    .unwrap(),
            );
        }
        assert!(last.unwrap().streak_bonus);
    }

    #[tokio::test]
    async fn test_reliability_floor_and_cap() {
        let (tracker, store, agent) = setup().await;
        // Drive reliability toward zero with hard failures.
        for _ in 0..20 {
            tracker
                .apply_outcome(agent, Uuid::new_v4(), false, 5, 0, Utc::now())
                .await
                .unwrap();
        }
        let score = store.get_reputation(agent).await.unwrap().unwrap();
        assert_eq!(score.reliability, 0);
        assert!(score.overall <= 1000);

        // And back up: cap holds at 1000.
        for _ in 0..100 {
            tracker
                .apply_outcome(agent, Uuid::new_v4(), true, 5, 95, Utc::now())
                .await
                .unwrap();
        }
        let score = store.get_reputation(agent).await.unwrap().unwrap();
        assert_eq!(score.reliability, 1000);
        assert!(score.overall <= 1000);
    }

    #[tokio::test]
    async fn test_tier_change_reported() {
        let (tracker, _store, agent) = setup().await;
        // Initial overall is 500 (Gold). Hard failures drop it.
        let mut saw_change = false;
        for _ in 0..10 {
            let applied = tracker
                .apply_outcome(agent, Uuid::new_v4(), false, 5, 0, Utc::now())
                .await
                .unwrap();
            if applied.tier_changed.is_some() {
                saw_change = true;
            }
        }
        assert!(saw_change);
    }

    #[tokio::test]
    async fn test_decay_skips_recently_active() {
        let (tracker, store, agent) = setup().await;
        let decayed = tracker
            .apply_inactivity_decay(Utc::now(), Duration::days(7), 50, 100)
            .await
            .unwrap();
        assert_eq!(decayed, 0);
        let score = store.get_reputation(agent).await.unwrap().unwrap();
        assert_eq!(score.reliability, 500);
    }

    #[tokio::test]
    async fn test_decay_floors() {
        let (tracker, store, agent) = setup().await;
        let long_ago = Utc::now() - Duration::days(30);
        let mut score = store.get_reputation(agent).await.unwrap().unwrap();
        score.reliability = 120;
        score.last_active_at = long_ago;
        store.update_reputation(score).await.unwrap();

        tracker
            .apply_inactivity_decay(Utc::now(), Duration::days(7), 50, 100)
            .await
            .unwrap();
        let score = store.get_reputation(agent).await.unwrap().unwrap();
        // 120 - 50 floors at 100, others decay normally.
        assert_eq!(score.reliability, 100);
        assert_eq!(score.quality, 450);

        // Repeated decay never goes below the floor.
        let mut score = store.get_reputation(agent).await.unwrap().unwrap();
        score.last_active_at = long_ago;
        store.update_reputation(score).await.unwrap();
        tracker
            .apply_inactivity_decay(Utc::now(), Duration::days(7), 50, 100)
            .await
            .unwrap();
        let score = store.get_reputation(agent).await.unwrap().unwrap();
        assert_eq!(score.reliability, 100);
    }
}
