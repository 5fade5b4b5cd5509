use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::entities::{Adapter, Identifier};
use crate::domain::ports::agent::*;
use crate::error::PoserError;
use crate::{DEFAULT_DISABLE_SETTLE_MS, DEFAULT_ENABLE_SETTLE_MS};

// ============================================================================
// BOUNCE TIMING
// ============================================================================

/// Settle delays around the disable/enable bounce.
///
/// These are empirical lower bounds for driver reload latency; shorter values
/// produce stale readbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BounceTiming {
    pub disable_settle: Duration,
    pub enable_settle: Duration,
}

impl Default for BounceTiming {
    fn default() -> Self {
        Self {
            disable_settle: Duration::from_millis(DEFAULT_DISABLE_SETTLE_MS),
            enable_settle: Duration::from_millis(DEFAULT_ENABLE_SETTLE_MS),
        }
    }
}

/// Phases of a single apply or restore call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfigPhase {
    Elevating,
    ResolvingKey,
    /// Write or remove the override, bounce, read back; one agent batch.
    Reconfiguring,
    Done,
}

// ============================================================================
// RECONFIGURATION AGENT
// ============================================================================

/// [`AdapterConfigAgent`] that drives any [`AgentChannel`] through
/// elevate → resolve key → write → bounce → read back.
pub struct ReconfigurationAgent<C> {
    channel: C,
    timing: BounceTiming,
}

#[async_trait]
impl<C> AdapterConfigAgent for ReconfigurationAgent<C>
where
    C: AgentChannel + Send + Sync,
{
    async fn list_adapters(&self) -> crate::Result<Vec<Adapter>> {
        let output = self.channel.send(&AgentRequest::ListAdapters).await?;
        parse_adapter_listing(&output)
    }

    async fn get_identifier(&self, adapter: &str) -> crate::Result<Identifier> {
        // confirms the adapter exists, so an empty readback means "no address"
        self.resolve_correlation_id(adapter).await?;
        self.read_identifier(adapter).await
    }

    async fn set_identifier(&self, adapter: &str, requested: &Identifier) -> crate::Result<SetOutcome> {
        // every applied value is unicast, whatever the caller passed
        let value = requested.with_unicast();
        let requested_form = value.agent_form();

        let result: crate::Result<Identifier> = async {
            self.elevate(adapter).await?;
            let key = self.resolve_key(adapter).await?;

            let mut steps = vec![
                AgentStep::Send(AgentRequest::WriteOverride {
                    key,
                    value: value.bare(),
                }),
                AgentStep::TrySend(AgentRequest::SetAdvancedProperty {
                    adapter: adapter.to_string(),
                    value: value.bare(),
                }),
            ];
            steps.extend(self.bounce_and_read_back(adapter));
            self.reconfigure(adapter, &steps).await
        }
        .await;

        match result {
            Ok(current) => {
                self.enter(adapter, ReconfigPhase::Done);
                let outcome = SetOutcome {
                    method: ApplyMethod::Registry,
                    requested: requested_form,
                    current,
                };
                if outcome.is_mismatch() {
                    warn!(
                        adapter,
                        requested = %outcome.requested,
                        current = %outcome.current,
                        "adapter did not adopt the requested identifier"
                    );
                } else {
                    info!(adapter, current = %outcome.current, "identifier applied");
                }
                Ok(outcome)
            }
            Err(e) => Err(self.failed(adapter, e)),
        }
    }

    async fn restore_identifier(&self, adapter: &str) -> crate::Result<RestoreOutcome> {
        let result: crate::Result<Identifier> = async {
            self.elevate(adapter).await?;
            let key = self.resolve_key(adapter).await?;

            let mut steps = vec![AgentStep::Send(AgentRequest::RemoveOverride { key })];
            steps.extend(self.bounce_and_read_back(adapter));
            self.reconfigure(adapter, &steps).await
        }
        .await;

        match result {
            Ok(current) => {
                self.enter(adapter, ReconfigPhase::Done);
                info!(adapter, current = %current, "factory identifier restored");
                Ok(RestoreOutcome { current })
            }
            Err(e) => Err(self.failed(adapter, e)),
        }
    }
}

impl<C> ReconfigurationAgent<C>
where
    C: AgentChannel + Send + Sync,
{
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            timing: BounceTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: BounceTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> BounceTiming {
        self.timing
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn enter(&self, adapter: &str, phase: ReconfigPhase) {
        debug!(adapter, phase = ?phase, "reconfiguration phase");
    }

    fn failed(&self, adapter: &str, error: PoserError) -> PoserError {
        warn!(adapter, error = %error, "reconfiguration failed");
        error
    }

    async fn elevate(&self, adapter: &str) -> crate::Result<()> {
        self.enter(adapter, ReconfigPhase::Elevating);
        self.channel.elevate().await
    }

    async fn resolve_correlation_id(&self, adapter: &str) -> crate::Result<String> {
        let correlation_id = self
            .channel
            .send(&AgentRequest::ResolveCorrelationId {
                adapter: adapter.to_string(),
            })
            .await?;
        if correlation_id.is_empty() {
            return Err(PoserError::AdapterNotFound(adapter.to_string()));
        }
        Ok(correlation_id)
    }

    /// Display name → correlation id → configuration entry. The entry is never
    /// looked up by name.
    async fn resolve_key(&self, adapter: &str) -> crate::Result<String> {
        self.enter(adapter, ReconfigPhase::ResolvingKey);

        let correlation_id = self.resolve_correlation_id(adapter).await?;
        let key = self
            .channel
            .send(&AgentRequest::FindConfigKey {
                correlation_id: correlation_id.clone(),
            })
            .await?;
        if key.is_empty() {
            return Err(PoserError::ConfigKeyNotFound {
                adapter: adapter.to_string(),
                correlation_id,
            });
        }

        debug!(adapter, %correlation_id, %key, "configuration entry resolved");
        Ok(key)
    }

    /// Disable, settle, enable, settle, read. Follows the write in the same batch.
    fn bounce_and_read_back(&self, adapter: &str) -> [AgentStep; 5] {
        [
            AgentStep::Send(AgentRequest::DisableAdapter {
                adapter: adapter.to_string(),
            }),
            AgentStep::Settle(self.timing.disable_settle),
            AgentStep::Send(AgentRequest::EnableAdapter {
                adapter: adapter.to_string(),
            }),
            AgentStep::Settle(self.timing.enable_settle),
            AgentStep::Send(AgentRequest::ReadIdentifier {
                adapter: adapter.to_string(),
            }),
        ]
    }

    /// Run the mutating sequence under one elevation and parse its readback.
    async fn reconfigure(&self, adapter: &str, steps: &[AgentStep]) -> crate::Result<Identifier> {
        self.enter(adapter, ReconfigPhase::Reconfiguring);
        let output = self.channel.send_batch(steps).await?;
        parse_readback(adapter, &output)
    }

    async fn read_identifier(&self, adapter: &str) -> crate::Result<Identifier> {
        let output = self
            .channel
            .send(&AgentRequest::ReadIdentifier {
                adapter: adapter.to_string(),
            })
            .await?;
        parse_readback(adapter, &output)
    }
}

/// Readback of an adapter already known to exist.
fn parse_readback(adapter: &str, output: &str) -> crate::Result<Identifier> {
    if output.is_empty() {
        return Err(PoserError::ExternalAgentFailure(format!(
            "'{}' reports no hardware address",
            adapter
        )));
    }

    Identifier::normalize(output).map_err(|_| {
        PoserError::ExternalAgentFailure(format!(
            "unrecognized identifier '{}' reported for '{}'",
            output, adapter
        ))
    })
}

// ============================================================================
// LISTING PARSER
// ============================================================================

/// Adapter record as the agent prints it.
#[derive(Debug, Deserialize)]
struct AdapterRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "InterfaceDescription", default)]
    description: Option<String>,
    #[serde(rename = "Status", default)]
    status: Option<serde_json::Value>,
    #[serde(rename = "MacAddress", default)]
    mac_address: Option<String>,
    #[serde(rename = "Guid", default)]
    guid: Option<String>,
}

/// A single adapter serializes as an object, several as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<AdapterRecord>),
    One(AdapterRecord),
}

fn parse_adapter_listing(output: &str) -> crate::Result<Vec<Adapter>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records = match serde_json::from_str::<OneOrMany>(output) {
        Ok(OneOrMany::Many(records)) => records,
        Ok(OneOrMany::One(record)) => vec![record],
        Err(e) => {
            return Err(PoserError::ExternalAgentFailure(format!(
                "unparseable adapter listing: {}",
                e
            )))
        }
    };

    Ok(records
        .into_iter()
        .map(|r| Adapter {
            name: r.name,
            description: r.description.unwrap_or_default(),
            status: r.status.map(status_text).unwrap_or_default(),
            identifier: r.mac_address.unwrap_or_default(),
            correlation_id: r.guid.unwrap_or_default(),
        })
        .collect())
}

fn status_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
