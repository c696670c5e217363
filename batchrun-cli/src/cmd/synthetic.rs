use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use batchrun_exec::{BoxError, Operation};

use crate::args::SimulationArgs;

#[derive(Debug, thiserror::Error)]
pub enum SimulatedError {
    #[error("rate limit exceeded, retry in {0} seconds")]
    RateLimitedFor(u64),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("item {0} rejected by remote")]
    Rejected(String),
}

/// Stand-in for a remote call: sleeps, then rolls a seeded die to decide the outcome.
pub struct SyntheticOperation {
    latency: Duration,
    fail_rate: f64,
    rate_limit_rate: f64,
    retry_after_secs: Option<u64>,
    rng: Mutex<fastrand::Rng>,
}

impl SyntheticOperation {
    pub fn new(args: &SimulationArgs) -> Result<Self, String> {
        for (name, rate) in [
            ("--fail-rate", args.fail_rate),
            ("--rate-limit-rate", args.rate_limit_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("{name} must be between 0 and 1, got {rate}"));
            }
        }
        if args.fail_rate + args.rate_limit_rate > 1.0 {
            return Err("--fail-rate and --rate-limit-rate must not add up to more than 1".into());
        }

        let rng = match args.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Ok(Self {
            latency: Duration::from_millis(args.latency_ms),
            fail_rate: args.fail_rate,
            rate_limit_rate: args.rate_limit_rate,
            retry_after_secs: args.retry_after_secs,
            rng: Mutex::new(rng),
        })
    }

    fn roll(&self) -> f64 {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.f64()
    }
}

#[async_trait]
impl Operation<String> for SyntheticOperation {
    async fn call(&self, id: &str) -> Result<String, BoxError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let roll = self.roll();
        if roll < self.rate_limit_rate {
            let err = match self.retry_after_secs {
                Some(secs) => SimulatedError::RateLimitedFor(secs),
                None => SimulatedError::RateLimited,
            };
            return Err(err.into());
        }
        if roll < self.rate_limit_rate + self.fail_rate {
            return Err(SimulatedError::Rejected(id.to_string()).into());
        }
        Ok(format!("processed {id}"))
    }
}
