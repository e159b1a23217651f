use std::sync::Arc;

use chrono::Duration;
use tokio::sync::watch;

use agora_assignment::AutoAssigner;
use agora_generator::TaskGenerator;
use agora_leaderboard::LeaderboardRecomputer;
use agora_reputation::ReputationTracker;
use agora_store::{ActivityLog, SimStateStore, TaskStore};
use agora_types::{
    ActivityEvent, ActivityKind, Clock, Result, SimulationState, TaskStatus, TickResult,
    TickStatus,
};

use crate::completion::CompletionProcessor;
use crate::config::EngineConfig;
use crate::scheduler::TickScheduler;

/// Top-level tick entry point. Safe to trigger concurrently: the
/// scheduler admits one tick body at a time and rate-limits re-entry;
/// everyone else gets a skipped result.
///
/// The tick is not transactional as a whole. Each step is fault-isolated
/// and each ledger/reputation operation has its own atomicity boundary;
/// step failures land in `TickResult.errors`.
pub struct TickOrchestrator {
    scheduler: TickScheduler,
    sim_state: Arc<dyn SimStateStore>,
    tasks: Arc<dyn TaskStore>,
    activity: Arc<dyn ActivityLog>,
    generator: TaskGenerator,
    assigner: AutoAssigner,
    completion: CompletionProcessor,
    tracker: ReputationTracker,
    leaderboard: LeaderboardRecomputer,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TickOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sim_state: Arc<dyn SimStateStore>,
        tasks: Arc<dyn TaskStore>,
        activity: Arc<dyn ActivityLog>,
        generator: TaskGenerator,
        assigner: AutoAssigner,
        completion: CompletionProcessor,
        tracker: ReputationTracker,
        leaderboard: LeaderboardRecomputer,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let scheduler = TickScheduler::new(
            Duration::seconds(config.min_tick_interval_secs),
            clock.clone(),
        );
        Self {
            scheduler,
            sim_state,
            tasks,
            activity,
            generator,
            assigner,
            completion,
            tracker,
            leaderboard,
            config,
            clock,
            shutdown_rx,
        }
    }

    /// Run one tick. Always returns a result; never blocks on the guard.
    pub async fn tick(&self) -> TickResult {
        if *self.shutdown_rx.borrow() {
            return TickResult::empty(TickStatus::ShuttingDown, 0);
        }

        let Some(_permit) = self.scheduler.try_begin() else {
            tracing::debug!("tick skipped: guard held or interval not elapsed");
            let tick_count = match self.sim_state.load_state().await {
                Ok(state) => state.tick_count,
                Err(_) => 0,
            };
            return TickResult::empty(TickStatus::Skipped, tick_count);
        };

        let mut state = match self.sim_state.load_state().await {
            Ok(state) => state,
            Err(err) => {
                let mut result = TickResult::empty(TickStatus::Completed, 0);
                result.success = false;
                result.errors.push(format!("loading simulation state: {err}"));
                return result;
            }
        };

        if state.paused {
            return TickResult::empty(TickStatus::Paused, state.tick_count);
        }

        state.tick_count += 1;
        let mut result = TickResult::empty(TickStatus::Completed, state.tick_count);
        if let Err(err) = self.sim_state.save_state(state.clone()).await {
            result.errors.push(format!("persisting tick counter: {err}"));
        }

        let now = self.clock.now();
        tracing::info!(tick = state.tick_count, "tick started");

        // Task generation, on cooldown, throttled toward the open-task cap.
        if cooldown_elapsed(state.last_task_batch_at, now, self.config.task_batch_cooldown_secs) {
            match self.generate_step(now).await {
                Ok(generated) => {
                    result.tasks_generated = generated;
                    state.last_task_batch_at = Some(now);
                }
                Err(err) => result.errors.push(format!("task generation: {err}")),
            }
        }

        // Assignment runs every tick: cheap and idempotent over open tasks.
        match self.assigner.assign_batch(self.config.assignment_batch, now).await {
            Ok(assignments) => {
                result.tasks_assigned = assignments.len() as u32;
                for assignment in &assignments {
                    if let Err(err) = self
                        .activity
                        .append_event(ActivityEvent::new(
                            ActivityKind::TaskAssigned,
                            format!(
                                "task {} assigned to {}",
                                assignment.task_id, assignment.agent_id
                            ),
                            Some(assignment.agent_id),
                            Some(assignment.task_id),
                        ))
                        .await
                    {
                        result.errors.push(format!("activity log: {err}"));
                    }
                }
            }
            Err(err) => result.errors.push(format!("auto-assignment: {err}")),
        }

        // Completion processing: expiry, outcome resolution, settlement.
        let stats = self.completion.run(self.config.completion_batch, now).await;
        result.tasks_completed = stats.completed;
        result.tasks_failed = stats.failed;
        result.tasks_expired = stats.expired;
        result.agents_archived = stats.archived;
        result.errors.extend(stats.errors);

        // Leaderboard rebuild (and reputation decay) on its own cooldown.
        if cooldown_elapsed(state.last_leaderboard_at, now, self.config.leaderboard_cooldown_secs) {
            if let Err(err) = self
                .tracker
                .apply_inactivity_decay(
                    now,
                    Duration::seconds(self.config.inactivity_threshold_secs),
                    self.config.decay_amount,
                    self.config.reputation_floor,
                )
                .await
            {
                result.errors.push(format!("inactivity decay: {err}"));
            }
            match self.leaderboard.rebuild(now).await {
                Ok(_) => {
                    result.leaderboard_refreshed = true;
                    state.last_leaderboard_at = Some(now);
                }
                Err(err) => result.errors.push(format!("leaderboard rebuild: {err}")),
            }
        }

        if let Err(err) = self.sim_state.save_state(state).await {
            result.errors.push(format!("persisting simulation state: {err}"));
        }

        result.success = result.errors.is_empty();
        tracing::info!(
            tick = result.tick_count,
            generated = result.tasks_generated,
            assigned = result.tasks_assigned,
            completed = result.tasks_completed,
            failed = result.tasks_failed,
            errors = result.errors.len(),
            "tick finished"
        );
        result
    }

    async fn generate_step(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u32> {
        let open = self.tasks.count_tasks_by_status(TaskStatus::Open).await?;
        let target = self.config.target_batch_size(open);
        let created = self.generator.generate_batch(target, now).await?;
        for task in &created {
            self.activity
                .append_event(ActivityEvent::new(
                    ActivityKind::TaskCreated,
                    format!("task {} posted ({:?}, reward {})", task.id, task.category, task.reward),
                    Some(task.poster_id),
                    Some(task.id),
                ))
                .await?;
        }
        Ok(created.len() as u32)
    }

    /// Pause the simulation starting from the next tick.
    pub async fn pause(&self) -> Result<()> {
        let mut state = self.sim_state.load_state().await?;
        state.paused = true;
        self.sim_state.save_state(state).await
    }

    /// Resume a paused simulation.
    pub async fn resume(&self) -> Result<()> {
        let mut state = self.sim_state.load_state().await?;
        state.paused = false;
        self.sim_state.save_state(state).await
    }

    /// Reset the simulation singleton: tick counter and cooldowns back to
    /// zero. Entity data is untouched.
    pub async fn reset_state(&self) -> Result<()> {
        self.sim_state.save_state(SimulationState::default()).await
    }

    /// Drive ticks on a fixed cadence until shutdown is signalled.
    pub async fn run(&self, cadence: std::time::Duration) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut interval = tokio::time::interval(cadence);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let result = self.tick().await;
                    if result.status == TickStatus::ShuttingDown {
                        break;
                    }
                }
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("tick loop shutting down");
                        break;
                    }
                }
            }
        }
    }
}

fn cooldown_elapsed(
    last: Option<chrono::DateTime<chrono::Utc>>,
    now: chrono::DateTime<chrono::Utc>,
    cooldown_secs: i64,
) -> bool {
    match last {
        Some(last) => now - last >= Duration::seconds(cooldown_secs),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_cooldown_elapsed() {
        let now = Utc::now();
        assert!(cooldown_elapsed(None, now, 30));
        assert!(!cooldown_elapsed(Some(now), now, 30));
        assert!(cooldown_elapsed(
            Some(now - Duration::seconds(31)),
            now,
            30
        ));
    }
}
