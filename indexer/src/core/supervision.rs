//! Supervision policy for a coordinator's child pools
//!
//! Only crashes reach this layer. Failures a worker reports as messages are
//! reconciled by the coordinator and never restart anything.

use serde::{Deserialize, Serialize};
use shared::{ChildFailure, FaultCategory, PoolKind};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// What to do with a crashed child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Respawn the failed worker
    Restart,
    /// Retire the failed worker permanently
    Stop,
    /// Hand the failure to the coordinator's parent
    Escalate,
}

/// Directive for a fault category, before the restart budget is applied
pub fn directive_for(category: FaultCategory) -> Directive {
    match category {
        FaultCategory::DataGeneration => Directive::Restart,
        FaultCategory::DocumentGeneration => Directive::Restart,
        FaultCategory::IndexWrite => Directive::Restart,
        FaultCategory::Initialization => Directive::Stop,
        FaultCategory::Killed => Directive::Stop,
        FaultCategory::Other => Directive::Restart,
        FaultCategory::Panic => Directive::Escalate,
    }
}

/// Restart budget parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartBudgetConfig {
    pub max_restarts: u32,
    pub window_secs: u64,
}

impl Default for RestartBudgetConfig {
    fn default() -> Self {
        Self {
            max_restarts: 10,
            window_secs: 60,
        }
    }
}

/// Rolling-window restart budget, tracked per child pool
#[derive(Debug, Clone)]
pub struct RestartBudget {
    max_restarts: u32,
    window: Duration,
    history: HashMap<PoolKind, VecDeque<Instant>>,
}

impl RestartBudget {
    pub fn new(max_restarts: u32, window: Duration) -> Self {
        Self {
            max_restarts,
            window,
            history: HashMap::new(),
        }
    }

    pub fn from_config(config: &RestartBudgetConfig) -> Self {
        Self::new(config.max_restarts, Duration::from_secs(config.window_secs))
    }

    /// Record a restart at `now` if the budget allows it
    pub fn try_restart(&mut self, pool: PoolKind, now: Instant) -> bool {
        let window = self.window;
        let restarts = self.history.entry(pool).or_default();
        while let Some(oldest) = restarts.front() {
            if now.saturating_duration_since(*oldest) >= window {
                restarts.pop_front();
            } else {
                break;
            }
        }

        if restarts.len() as u32 >= self.max_restarts {
            return false;
        }
        restarts.push_back(now);
        true
    }

    /// Restarts recorded for a pool inside the current window
    pub fn restarts_in_window(&self, pool: PoolKind) -> usize {
        self.history.get(&pool).map_or(0, VecDeque::len)
    }
}

/// One-for-one supervisor: a crash only affects the failing worker
#[derive(Debug, Clone)]
pub struct Supervisor {
    budget: RestartBudget,
}

impl Supervisor {
    pub fn new(budget: RestartBudget) -> Self {
        Self { budget }
    }

    pub fn decide(&mut self, failure: &ChildFailure) -> Directive {
        self.decide_at(failure, Instant::now())
    }

    pub fn decide_at(&mut self, failure: &ChildFailure, now: Instant) -> Directive {
        match directive_for(failure.category) {
            Directive::Restart if !self.budget.try_restart(failure.pool, now) => Directive::Escalate,
            directive => directive,
        }
    }

    pub fn budget(&self) -> &RestartBudget {
        &self.budget
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(RestartBudget::from_config(&RestartBudgetConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(pool: PoolKind, category: FaultCategory) -> ChildFailure {
        ChildFailure {
            pool,
            worker: 0,
            category,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_directive_table() {
        assert_eq!(directive_for(FaultCategory::DataGeneration), Directive::Restart);
        assert_eq!(directive_for(FaultCategory::DocumentGeneration), Directive::Restart);
        assert_eq!(directive_for(FaultCategory::IndexWrite), Directive::Restart);
        assert_eq!(directive_for(FaultCategory::Initialization), Directive::Stop);
        assert_eq!(directive_for(FaultCategory::Killed), Directive::Stop);
        assert_eq!(directive_for(FaultCategory::Other), Directive::Restart);
        assert_eq!(directive_for(FaultCategory::Panic), Directive::Escalate);
    }

    #[test]
    fn test_eleventh_crash_in_a_minute_escalates() {
        let mut supervisor = Supervisor::default();
        let crash = failure(PoolKind::DocumentGenerator, FaultCategory::DocumentGeneration);
        let start = Instant::now();

        for i in 0..10 {
            let at = start + Duration::from_secs(i * 5);
            assert_eq!(supervisor.decide_at(&crash, at), Directive::Restart, "crash {}", i + 1);
        }
        assert_eq!(
            supervisor.decide_at(&crash, start + Duration::from_secs(55)),
            Directive::Escalate
        );
    }

    #[test]
    fn test_budget_window_rolls() {
        let mut budget = RestartBudget::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(budget.try_restart(PoolKind::IndexWriter, start));
        assert!(budget.try_restart(PoolKind::IndexWriter, start + Duration::from_secs(10)));
        assert!(!budget.try_restart(PoolKind::IndexWriter, start + Duration::from_secs(20)));

        // The first restart has left the window
        assert!(budget.try_restart(PoolKind::IndexWriter, start + Duration::from_secs(61)));
        assert_eq!(budget.restarts_in_window(PoolKind::IndexWriter), 2);
    }

    #[test]
    fn test_budget_is_per_pool() {
        let mut budget = RestartBudget::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(budget.try_restart(PoolKind::DataGenerator, now));
        assert!(!budget.try_restart(PoolKind::DataGenerator, now));
        assert!(budget.try_restart(PoolKind::IndexWriter, now));
    }

    #[test]
    fn test_stop_directives_do_not_consume_budget() {
        let mut supervisor = Supervisor::new(RestartBudget::new(1, Duration::from_secs(60)));
        let killed = failure(PoolKind::IndexWriter, FaultCategory::Killed);

        assert_eq!(supervisor.decide(&killed), Directive::Stop);
        assert_eq!(supervisor.decide(&killed), Directive::Stop);
        assert_eq!(supervisor.budget().restarts_in_window(PoolKind::IndexWriter), 0);
    }
}
