use std::ops::RangeInclusive;

use agora_types::TaskCategory;

/// Template describing the parameter ranges a generated task is sampled
/// from. Weights drive the categorical draw over the catalog.
#[derive(Debug, Clone)]
pub struct TaskTemplate {
    pub category: TaskCategory,
    pub weight: u32,
    pub difficulty: RangeInclusive<u8>,
    pub reward: RangeInclusive<i64>,
    /// Deposit as a percentage of the sampled reward.
    pub deposit_percent: RangeInclusive<u8>,
    pub slash_percent: RangeInclusive<u8>,
    pub min_reputation: RangeInclusive<u32>,
    /// Seconds the assignee gets to execute.
    pub execution_window_secs: RangeInclusive<i64>,
    /// Seconds an unassigned posting stays open before expiring.
    pub posting_window_secs: i64,
}

/// The fixed catalog. Weights sum to 100.
pub fn default_catalog() -> Vec<TaskTemplate> {
    vec![
        TaskTemplate {
            category: TaskCategory::DataProcessing,
            weight: 25,
            difficulty: 1..=3,
            reward: 50..=200,
            deposit_percent: 10..=20,
            slash_percent: 10..=25,
            min_reputation: 0..=300,
            execution_window_secs: 60..=300,
            posting_window_secs: 3600,
        },
        TaskTemplate {
            category: TaskCategory::CodeGeneration,
            weight: 20,
            difficulty: 2..=5,
            reward: 150..=600,
            deposit_percent: 15..=30,
            slash_percent: 20..=40,
            min_reputation: 300..=600,
            execution_window_secs: 120..=600,
            posting_window_secs: 7200,
        },
        TaskTemplate {
            category: TaskCategory::Research,
            weight: 20,
            difficulty: 2..=4,
            reward: 100..=400,
            deposit_percent: 10..=25,
            slash_percent: 15..=30,
            min_reputation: 200..=500,
            execution_window_secs: 180..=900,
            posting_window_secs: 7200,
        },
        TaskTemplate {
            category: TaskCategory::Translation,
            weight: 15,
            difficulty: 1..=3,
            reward: 40..=150,
            deposit_percent: 10..=15,
            slash_percent: 10..=20,
            min_reputation: 0..=250,
            execution_window_secs: 60..=240,
            posting_window_secs: 3600,
        },
        TaskTemplate {
            category: TaskCategory::Review,
            weight: 12,
            difficulty: 2..=4,
            reward: 80..=300,
            deposit_percent: 10..=20,
            slash_percent: 15..=30,
            min_reputation: 250..=550,
            execution_window_secs: 120..=480,
            posting_window_secs: 5400,
        },
        TaskTemplate {
            category: TaskCategory::Creative,
            weight: 8,
            difficulty: 3..=5,
            reward: 200..=800,
            deposit_percent: 20..=35,
            slash_percent: 25..=50,
            min_reputation: 400..=700,
            execution_window_secs: 300..=1200,
            posting_window_secs: 10800,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_weights_sum_to_100() {
        let total: u32 = default_catalog().iter().map(|t| t.weight).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_catalog_ranges_are_ordered() {
        for template in default_catalog() {
            assert!(template.difficulty.start() <= template.difficulty.end());
            assert!(template.reward.start() <= template.reward.end());
            assert!(*template.difficulty.start() >= 1);
            assert!(*template.difficulty.end() <= 5);
            assert!(*template.slash_percent.end() <= 100);
        }
    }
}
