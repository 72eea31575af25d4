use std::time::Duration;

use crate::training::TrainStats;

/// Counters accumulated over a worker's lifetime.
#[derive(Debug, Default, Clone)]
pub struct WorkerMetrics {
    pub recv_time: Duration,
    pub compute_time: Duration,
    pub send_time: Duration,

    pub iterations: u64,
    pub steps: u64,
    pub episodes: u64,
    pub reward: f64,
}

impl WorkerMetrics {
    #[inline]
    pub fn bump_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Folds one rollout's statistics into the totals.
    pub fn record(&mut self, stats: &TrainStats) {
        self.steps += stats.steps as u64;
        self.reward += f64::from(stats.reward);
        if stats.terminal {
            self.episodes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_rollouts_count_as_episodes() {
        let mut metrics = WorkerMetrics::default();

        let open = TrainStats {
            steps: 5,
            reward: -0.004,
            loss: 1.,
            terminal: false,
        };
        let done = TrainStats {
            steps: 2,
            reward: 1.,
            loss: 0.5,
            terminal: true,
        };

        metrics.record(&open);
        metrics.record(&done);

        assert_eq!(metrics.steps, 7);
        assert_eq!(metrics.episodes, 1);
        assert!((metrics.reward - 0.996).abs() < 1e-6);
    }
}
