use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::domain::entities::Identifier;
use crate::domain::ports::agent::AdapterConfigAgent;
use crate::domain::ports::notification::{StatusLevel, StatusSink};
use crate::domain::services::RotationHooks;

/// Scheduler hooks that apply rotated identifiers to one adapter through the
/// configuration agent and report to a console sink.
pub struct AgentRotationHooks {
    agent: Arc<dyn AdapterConfigAgent + Send + Sync>,
    adapter: String,
    sink: Arc<dyn StatusSink + Send + Sync>,
    last_offered: Mutex<Option<Identifier>>,
}

impl AgentRotationHooks {
    pub fn new(
        agent: Arc<dyn AdapterConfigAgent + Send + Sync>,
        adapter: impl Into<String>,
        sink: Arc<dyn StatusSink + Send + Sync>,
    ) -> Self {
        Self {
            agent,
            adapter: adapter.into(),
            sink,
            last_offered: Mutex::new(None),
        }
    }

    /// Most recent identifier handed out by the scheduler
    pub fn last_offered(&self) -> Option<Identifier> {
        self.last_offered.lock().ok().and_then(|slot| *slot)
    }
}

#[async_trait]
impl RotationHooks for AgentRotationHooks {
    fn offer(&self, identifier: &Identifier) {
        if let Ok(mut slot) = self.last_offered.lock() {
            *slot = Some(*identifier);
        }
        self.sink.status(&format!("Generated {}", identifier), StatusLevel::Info);
    }

    async fn apply(&self, identifier: &Identifier) -> crate::Result<()> {
        let outcome = self.agent.set_identifier(&self.adapter, identifier).await?;
        info!(adapter = %self.adapter, requested = %outcome.requested, current = %outcome.current, "rotation applied");

        if outcome.is_mismatch() {
            self.sink.status(
                &format!(
                    "{} reports {} after requesting {}; the driver may ignore overrides",
                    self.adapter, outcome.current, outcome.requested
                ),
                StatusLevel::Error,
            );
        } else {
            self.sink.status(
                &format!("Applied {} to {} via {}", outcome.current, self.adapter, outcome.method),
                StatusLevel::Ok,
            );
        }
        Ok(())
    }

    fn report_status(&self, message: &str, level: StatusLevel) {
        self.sink.status(message, level);
    }

    fn refresh_countdown(&self, remaining: Option<Duration>) {
        self.sink.countdown(remaining);
    }
}
