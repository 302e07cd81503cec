mod scoring_task;

pub use scoring_task::ScoringTask;
