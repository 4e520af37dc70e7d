use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    // per-organization ceiling on jobs in {pending, queued, running}
    pub max_concurrent_jobs: usize,
    pub admission_tick: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            admission_tick: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_concurrent_jobs: env_parsed(
                "MAX_CONCURRENT_JOBS_PER_ORG",
                defaults.max_concurrent_jobs,
            ),
            admission_tick: Duration::from_secs(env_parsed(
                "ADMISSION_TICK_SECONDS",
                defaults.admission_tick.as_secs(),
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RolloutConfig {
    // fleet-wide cap on simultaneous installs
    pub max_concurrent_installs: usize,
    // manual RetryDeployment ceiling
    pub retry_limit: i32,
    // automatic requeues for transient failures before manual intervention
    pub auto_retry_limit: i32,
    pub auto_retry_backoff: Vec<Duration>,
    pub rollout_tick: Duration,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            max_concurrent_installs: 4,
            retry_limit: 3,
            auto_retry_limit: 2,
            auto_retry_backoff: vec![Duration::from_secs(30), Duration::from_secs(120)],
            rollout_tick: Duration::from_secs(1),
        }
    }
}

impl RolloutConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let auto_retry_backoff = match dotenvy::var("AUTO_RETRY_BACKOFF_SECONDS") {
            Ok(raw) => {
                let parsed: Vec<Duration> = raw
                    .split(',')
                    .filter_map(|part| part.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .collect();

                if parsed.is_empty() {
                    defaults.auto_retry_backoff.clone()
                } else {
                    parsed
                }
            }
            Err(_) => defaults.auto_retry_backoff.clone(),
        };

        Self {
            max_concurrent_installs: env_parsed(
                "MAX_CONCURRENT_INSTALLS",
                defaults.max_concurrent_installs,
            ),
            retry_limit: env_parsed("DEPLOYMENT_RETRY_LIMIT", defaults.retry_limit),
            auto_retry_limit: env_parsed("DEPLOYMENT_AUTO_RETRY_LIMIT", defaults.auto_retry_limit),
            auto_retry_backoff,
            rollout_tick: Duration::from_secs(env_parsed(
                "ROLLOUT_TICK_SECONDS",
                defaults.rollout_tick.as_secs(),
            )),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    dotenvy::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
