//! Quorum readiness probe
//!
//! Polls the controllers with `kafka-metadata-quorum.sh describe --status`
//! until one of them reports a leader or the deadline passes. The first
//! controller that reports a leader wins; the others are not consulted.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::runtime::kafka::{parse_leader_id, KafkaTools};

/// Outcome of waiting for quorum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuorumStatus {
    Reached { controller: String, leader_id: i64 },
    TimedOut { last_error: Option<String> },
}

impl QuorumStatus {
    pub fn is_reached(&self) -> bool {
        matches!(self, QuorumStatus::Reached { .. })
    }
}

pub struct QuorumProbe {
    tools: KafkaTools,
    poll_interval: Duration,
}

impl QuorumProbe {
    pub fn new(tools: KafkaTools, poll_interval: Duration) -> Self {
        Self {
            tools,
            poll_interval,
        }
    }

    /// Poll `controllers` in order, round after round, until a leader is seen
    /// or `timeout` has elapsed
    pub async fn wait_for_quorum(&self, controllers: &[String], timeout: Duration) -> QuorumStatus {
        let deadline = Instant::now() + timeout;
        let mut last_error = None;
        let mut round = 0u32;

        loop {
            round += 1;
            for controller in controllers {
                let remaining = deadline.saturating_duration_since(Instant::now());
                // every controller is asked at least once, even with no time left
                if remaining.is_zero() && round > 1 {
                    break;
                }
                let Ok(response) =
                    tokio::time::timeout(remaining, self.tools.quorum_status(controller)).await
                else {
                    last_error = Some(format!(
                        "{}: no response within {:?}",
                        controller, remaining
                    ));
                    continue;
                };
                match response {
                    Ok(output) if output.success() => match parse_leader_id(&output.stdout) {
                        Some(leader_id) => {
                            info!("Quorum OK via controller {} (leader {})", controller, leader_id);
                            return QuorumStatus::Reached {
                                controller: controller.clone(),
                                leader_id,
                            };
                        }
                        None => {
                            last_error = Some(format!("{}: no leader elected yet", controller));
                        }
                    },
                    Ok(output) => {
                        last_error = Some(format!(
                            "{}: exit {:?}: {}",
                            controller,
                            output.code,
                            output.stderr.trim()
                        ));
                    }
                    Err(e) => {
                        last_error = Some(format!("{}: {}", controller, e));
                    }
                }
            }
            debug!("Quorum round {} found no leader: {:?}", round, last_error);

            let now = Instant::now();
            if now >= deadline {
                warn!("Timed out waiting for quorum. Last error: {:?}", last_error);
                return QuorumStatus::TimedOut { last_error };
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
