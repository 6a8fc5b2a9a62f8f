// Runtime configuration entities

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSizes {
    pub tournaments: u32,
    pub standings: u32,
    pub seeds: u32,
    pub sets: u32,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            tournaments: 100,
            standings: 200,
            seeds: 200,
            sets: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_floor: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            rate_limit_floor: Duration::from_secs(60),
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed server-error attempt.
    pub fn server_backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << shift;
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    pub fn rate_limit_wait(&self, hint: Option<Duration>) -> Duration {
        hint.unwrap_or(self.rate_limit_floor)
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub data_dir: String,
    pub game_id: u64,
    pub country_code: Option<String>,
    pub worker_count: usize,
    pub page_sizes: PageSizes,
    pub max_pages: u32,
    pub json_indent: usize,
    /// Oldest container start (inclusive) the sync walks back to.
    pub window_start: Option<i64>,
    /// Newest container start (inclusive) the sync considers.
    pub window_end: Option<i64>,
    pub missing_field_rate_threshold: f64,
    pub max_integrity_issues: usize,
    pub strict_placements: bool,
    pub retry: RetryPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            game_id: 1386,
            country_code: None,
            worker_count: 4,
            page_sizes: PageSizes::default(),
            max_pages: 10_000,
            json_indent: 2,
            window_start: None,
            window_end: None,
            missing_field_rate_threshold: 0.5,
            max_integrity_issues: 0,
            strict_placements: true,
            retry: RetryPolicy::default(),
        }
    }
}
