use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine tuning knobs. Loaded from `engine.toml` when present,
/// otherwise defaults apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum seconds between executed tick bodies.
    #[serde(default = "default_min_tick_interval_secs")]
    pub min_tick_interval_secs: i64,

    /// Cooldown between task-generation batches.
    #[serde(default = "default_task_batch_cooldown_secs")]
    pub task_batch_cooldown_secs: i64,

    /// Open-task population cap; generation shrinks linearly toward it.
    #[serde(default = "default_max_open_tasks")]
    pub max_open_tasks: usize,

    /// Largest generation batch when the open-task pool is empty.
    #[serde(default = "default_task_batch_max")]
    pub task_batch_max: u32,

    /// Open tasks scanned per tick by the auto-assigner.
    #[serde(default = "default_assignment_batch")]
    pub assignment_batch: usize,

    /// Assigned tasks resolved per tick; bounds tick latency.
    #[serde(default = "default_completion_batch")]
    pub completion_batch: usize,

    /// Cooldown between leaderboard rebuilds (and reputation decay).
    #[serde(default = "default_leaderboard_cooldown_secs")]
    pub leaderboard_cooldown_secs: i64,

    /// Seconds of inactivity before reputation decay applies.
    #[serde(default = "default_inactivity_threshold_secs")]
    pub inactivity_threshold_secs: i64,

    /// Points removed from each component per decay application.
    #[serde(default = "default_decay_amount")]
    pub decay_amount: u32,

    /// Decay never drives a component below this floor.
    #[serde(default = "default_reputation_floor")]
    pub reputation_floor: u32,
}

fn default_min_tick_interval_secs() -> i64 {
    2
}

fn default_task_batch_cooldown_secs() -> i64 {
    30
}

fn default_max_open_tasks() -> usize {
    50
}

fn default_task_batch_max() -> u32 {
    10
}

fn default_assignment_batch() -> usize {
    25
}

fn default_completion_batch() -> usize {
    25
}

fn default_leaderboard_cooldown_secs() -> i64 {
    60
}

fn default_inactivity_threshold_secs() -> i64 {
    3 * 86_400
}

fn default_decay_amount() -> u32 {
    25
}

fn default_reputation_floor() -> u32 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_tick_interval_secs: default_min_tick_interval_secs(),
            task_batch_cooldown_secs: default_task_batch_cooldown_secs(),
            max_open_tasks: default_max_open_tasks(),
            task_batch_max: default_task_batch_max(),
            assignment_batch: default_assignment_batch(),
            completion_batch: default_completion_batch(),
            leaderboard_cooldown_secs: default_leaderboard_cooldown_secs(),
            inactivity_threshold_secs: default_inactivity_threshold_secs(),
            decay_amount: default_decay_amount(),
            reputation_floor: default_reputation_floor(),
        }
    }
}

impl EngineConfig {
    pub fn config_path(state_dir: &Path) -> PathBuf {
        state_dir.join("engine.toml")
    }

    /// Load config from disk. Returns defaults if not found.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = Self::config_path(state_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).context("Failed to read engine config")?;
        let config: Self = toml::from_str(&content).context("Failed to parse engine config")?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let path = Self::config_path(state_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize engine config")?;
        std::fs::write(&path, content).context("Failed to write engine config")?;
        Ok(())
    }

    /// Target generation batch: shrinks linearly to zero as the open-task
    /// count approaches the cap.
    pub fn target_batch_size(&self, open_tasks: usize) -> u32 {
        if open_tasks >= self.max_open_tasks {
            return 0;
        }
        // Integer arithmetic: a float headroom near the cap rounds
        // 0.999... down to zero one step too early.
        let headroom = (self.max_open_tasks - open_tasks) as u64;
        (u64::from(self.task_batch_max) * headroom / self.max_open_tasks as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.min_tick_interval_secs, 2);
        assert_eq!(config.max_open_tasks, 50);
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.task_batch_max = 3;
        config.save(dir.path()).unwrap();
        let loaded = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.task_batch_max, 3);
    }

    #[test]
    fn test_load_missing_gives_defaults() {
        let dir = tempdir().unwrap();
        let loaded = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.completion_batch, 25);
    }

    #[test]
    fn test_target_batch_shrinks_linearly() {
        let config = EngineConfig {
            max_open_tasks: 50,
            task_batch_max: 10,
            ..Default::default()
        };
        assert_eq!(config.target_batch_size(0), 10);
        assert_eq!(config.target_batch_size(25), 5);
        assert_eq!(config.target_batch_size(45), 1);
        assert_eq!(config.target_batch_size(50), 0);
        assert_eq!(config.target_batch_size(500), 0);
    }
}
