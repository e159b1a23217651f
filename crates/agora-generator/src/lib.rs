//! Task generation: samples new task records from a weighted template
//! catalog and posts them on behalf of randomly chosen active agents.

pub mod templates;

pub use templates::{TaskTemplate, default_catalog};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use uuid::Uuid;

use agora_store::{AgentStore, TaskStore};
use agora_types::{AgentStatus, AgoraError, Result, RiskRating, Task, TaskStatus};

#[derive(Clone)]
pub struct TaskGenerator {
    agents: Arc<dyn AgentStore>,
    tasks: Arc<dyn TaskStore>,
    catalog: Arc<Vec<TaskTemplate>>,
}

impl TaskGenerator {
    pub fn new(agents: Arc<dyn AgentStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self::with_catalog(agents, tasks, default_catalog())
    }

    pub fn with_catalog(
        agents: Arc<dyn AgentStore>,
        tasks: Arc<dyn TaskStore>,
        catalog: Vec<TaskTemplate>,
    ) -> Self {
        Self {
            agents,
            tasks,
            catalog: Arc::new(catalog),
        }
    }

    /// Generate up to `target` tasks. Returns how many were created.
    /// No active agents means no posters, which yields zero tasks and is
    /// not an error.
    pub async fn generate_batch(&self, target: u32, now: DateTime<Utc>) -> Result<Vec<Task>> {
        if target == 0 {
            return Ok(Vec::new());
        }
        let posters = self.agents.list_agents_by_status(AgentStatus::Active).await?;
        if posters.is_empty() {
            tracing::debug!("no active agents to post tasks; skipping generation");
            return Ok(Vec::new());
        }

        let weights: Vec<u32> = self.catalog.iter().map(|t| t.weight).collect();
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| AgoraError::Internal(format!("bad catalog weights: {e}")))?;

        // All sampling happens before the first await: ThreadRng is not
        // Send and must not be held across a suspension point.
        let created: Vec<Task> = {
            let mut rng = rand::thread_rng();
            (0..target)
                .map(|_| {
                    let template = &self.catalog[dist.sample(&mut rng)];
                    let poster = posters.choose(&mut rng).expect("non-empty poster set");
                    sample_task(template, poster.id, now, &mut rng)
                })
                .collect()
        };
        for task in &created {
            self.tasks.insert_task(task.clone()).await?;
            tracing::debug!(task_id = %task.id, category = ?task.category, "task generated");
        }
        Ok(created)
    }
}

fn sample_task(
    template: &TaskTemplate,
    poster_id: Uuid,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Task {
    let difficulty = rng.gen_range(template.difficulty.clone());
    let reward = rng.gen_range(template.reward.clone());
    let deposit_percent = rng.gen_range(template.deposit_percent.clone());
    let slash_percent = rng.gen_range(template.slash_percent.clone());
    // Deposit as a fraction of the reward; at least one token.
    let deposit = (reward * i64::from(deposit_percent) / 100).max(1);

    Task {
        id: Uuid::new_v4(),
        category: template.category,
        difficulty,
        reward,
        deposit,
        slash_percent,
        risk: RiskRating::for_task(difficulty, slash_percent),
        min_reputation: rng.gen_range(template.min_reputation.clone()),
        execution_window_secs: rng.gen_range(template.execution_window_secs.clone()),
        expires_at: now + Duration::seconds(template.posting_window_secs),
        status: TaskStatus::Open,
        poster_id,
        assigned_agent_id: None,
        created_at: now,
        accepted_at: None,
        resolved_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::MemoryStore;
    use agora_types::{Agent, AgentRole};

    #[tokio::test]
    async fn test_no_active_agents_yields_zero_tasks() {
        let store = Arc::new(MemoryStore::new());
        let generator = TaskGenerator::new(store.clone(), store.clone());
        let created = generator.generate_batch(5, Utc::now()).await.unwrap();
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn test_generates_requested_count() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_agent(Agent::new("poster", AgentRole::Generalist))
            .await
            .unwrap();
        let generator = TaskGenerator::new(store.clone(), store.clone());
        let created = generator.generate_batch(8, Utc::now()).await.unwrap();
        assert_eq!(created.len(), 8);
        assert_eq!(
            store.count_tasks_by_status(TaskStatus::Open).await.unwrap(),
            8
        );
    }

    #[tokio::test]
    async fn test_sampled_fields_within_template_ranges() {
        let store = Arc::new(MemoryStore::new());
        let poster = Agent::new("poster", AgentRole::Analyst);
        let poster_id = poster.id;
        store.insert_agent(poster).await.unwrap();
        let generator = TaskGenerator::new(store.clone(), store.clone());

        let now = Utc::now();
        for task in generator.generate_batch(50, now).await.unwrap() {
            assert!((1..=5).contains(&task.difficulty));
            assert!(task.reward > 0);
            assert!(task.deposit >= 1);
            assert!(task.deposit <= task.reward);
            assert!(task.slash_percent <= 100);
            assert_eq!(task.status, TaskStatus::Open);
            assert_eq!(task.poster_id, poster_id);
            assert!(task.expires_at > now);
            assert_eq!(task.risk, RiskRating::for_task(task.difficulty, task.slash_percent));
        }
    }

    #[test]
    fn test_generate_batch_future_is_send() {
        // The tick runs inside tokio::spawn and axum handlers, both of
        // which require Send futures.
        fn assert_send<T: Send>(_: T) {}
        let store = Arc::new(MemoryStore::new());
        let generator = TaskGenerator::new(store.clone(), store);
        assert_send(generator.generate_batch(3, Utc::now()));
    }

    #[tokio::test]
    async fn test_zero_target_is_noop() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_agent(Agent::new("poster", AgentRole::Generalist))
            .await
            .unwrap();
        let generator = TaskGenerator::new(store.clone(), store.clone());
        assert!(generator.generate_batch(0, Utc::now()).await.unwrap().is_empty());
    }
}
