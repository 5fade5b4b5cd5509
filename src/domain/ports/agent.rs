use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::domain::entities::{Adapter, Identifier};

// ============================================================================
// ADAPTER CONFIGURATION PORTS
// ============================================================================

/// Port for reading and reconfiguring a host's network adapters.
///
/// Every call goes through the privileged configuration agent, so every call
/// may suspend. Mutating calls require elevation.
#[async_trait]
pub trait AdapterConfigAgent {
    /// Enumerate all adapters with their correlation ids, in OS order.
    async fn list_adapters(&self) -> crate::Result<Vec<Adapter>>;

    /// Read the adapter's currently active identifier.
    async fn get_identifier(&self, adapter: &str) -> crate::Result<Identifier>;

    /// Persist `requested` as the adapter's override and bounce the adapter.
    async fn set_identifier(&self, adapter: &str, requested: &Identifier) -> crate::Result<SetOutcome>;

    /// Remove any override and bounce the adapter back to its burned-in address.
    async fn restore_identifier(&self, adapter: &str) -> crate::Result<RestoreOutcome>;
}

/// Opaque request/response channel to the external configuration mechanism.
///
/// Exit code 0 yields the textual result; anything else is an error carrying
/// the agent's diagnostics.
#[async_trait]
pub trait AgentChannel {
    /// Acquire elevated privilege. Declined or unavailable elevation is
    /// `PermissionDenied`.
    async fn elevate(&self) -> crate::Result<()>;

    /// Execute one request and return its trimmed textual output.
    async fn send(&self, request: &AgentRequest) -> crate::Result<String>;

    /// Execute a sequence as one unit and return the output of its last
    /// [`AgentStep::Send`]. Channels that elevate per invocation override this
    /// so the whole sequence runs under a single elevation.
    async fn send_batch(&self, steps: &[AgentStep]) -> crate::Result<String> {
        let mut last = String::new();
        for step in steps {
            match step {
                AgentStep::Send(request) => last = self.send(request).await?,
                AgentStep::TrySend(request) => {
                    if let Err(e) = self.send(request).await {
                        debug!(kind = request.kind(), error = %e, "best-effort step failed, continuing");
                    }
                }
                AgentStep::Settle(delay) => tokio::time::sleep(*delay).await,
            }
        }
        Ok(last)
    }
}

// ============================================================================
// SUPPORTING TYPES
// ============================================================================

/// One step the configuration agent knows how to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRequest {
    /// JSON list of adapters with their correlation ids.
    ListAdapters,
    /// Active identifier of the named adapter.
    ReadIdentifier { adapter: String },
    /// Correlation id for a display name; empty output when no such adapter.
    ResolveCorrelationId { adapter: String },
    /// Path of the configuration entry whose instance id matches; empty output
    /// when none matches.
    FindConfigKey { correlation_id: String },
    /// Create or overwrite the override value in a configuration entry.
    WriteOverride { key: String, value: String },
    /// Vendor advanced-property path. Compatibility aid only.
    SetAdvancedProperty { adapter: String, value: String },
    /// Delete the override value if present.
    RemoveOverride { key: String },
    DisableAdapter { adapter: String },
    EnableAdapter { adapter: String },
    /// Prints whether the channel currently holds elevated privilege.
    CheckElevation,
}

impl AgentRequest {
    /// Requests that change adapter configuration or state.
    pub fn requires_elevation(&self) -> bool {
        matches!(
            self,
            AgentRequest::WriteOverride { .. }
                | AgentRequest::SetAdvancedProperty { .. }
                | AgentRequest::RemoveOverride { .. }
                | AgentRequest::DisableAdapter { .. }
                | AgentRequest::EnableAdapter { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentRequest::ListAdapters => "list_adapters",
            AgentRequest::ReadIdentifier { .. } => "read_identifier",
            AgentRequest::ResolveCorrelationId { .. } => "resolve_correlation_id",
            AgentRequest::FindConfigKey { .. } => "find_config_key",
            AgentRequest::WriteOverride { .. } => "write_override",
            AgentRequest::SetAdvancedProperty { .. } => "set_advanced_property",
            AgentRequest::RemoveOverride { .. } => "remove_override",
            AgentRequest::DisableAdapter { .. } => "disable_adapter",
            AgentRequest::EnableAdapter { .. } => "enable_adapter",
            AgentRequest::CheckElevation => "check_elevation",
        }
    }
}

/// One entry of a batched agent sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    /// Run the request; a failure aborts the batch.
    Send(AgentRequest),
    /// Run the request; a failure is logged and the batch continues.
    TrySend(AgentRequest),
    /// Wait before the next step.
    Settle(Duration),
}

impl AgentStep {
    pub fn requires_elevation(&self) -> bool {
        match self {
            AgentStep::Send(request) | AgentStep::TrySend(request) => request.requires_elevation(),
            AgentStep::Settle(_) => false,
        }
    }
}

/// How an override was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApplyMethod {
    Registry,
}

impl fmt::Display for ApplyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMethod::Registry => f.write_str("Registry"),
        }
    }
}

/// Result of a successful `set_identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetOutcome {
    pub method: ApplyMethod,
    /// The value as it was handed to the agent (hyphenated, unicast enforced).
    pub requested: String,
    /// What the adapter reports after the bounce.
    pub current: Identifier,
}

impl SetOutcome {
    /// True when the driver or OS silently declined the override.
    pub fn is_mismatch(&self) -> bool {
        Identifier::normalize(&self.requested)
            .map(|requested| requested != self.current)
            .unwrap_or(true)
    }
}

/// Result of a successful `restore_identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub current: Identifier,
}

/// Wire shape `{ok, method, requested, current}` for callers that report JSON.
#[derive(Debug, Serialize)]
pub struct SetReport<'a> {
    pub ok: bool,
    pub method: String,
    pub requested: &'a str,
    pub current: String,
}

impl<'a> From<&'a SetOutcome> for SetReport<'a> {
    fn from(outcome: &'a SetOutcome) -> Self {
        Self {
            ok: true,
            method: outcome.method.to_string(),
            requested: &outcome.requested,
            current: outcome.current.agent_form(),
        }
    }
}

/// Wire shape `{ok, current}`.
#[derive(Debug, Serialize)]
pub struct RestoreReport {
    pub ok: bool,
    pub current: String,
}

impl From<&RestoreOutcome> for RestoreReport {
    fn from(outcome: &RestoreOutcome) -> Self {
        Self {
            ok: true,
            current: outcome.current.agent_form(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_requests_need_elevation() {
        assert!(AgentRequest::DisableAdapter { adapter: "Wi-Fi".into() }.requires_elevation());
        assert!(AgentRequest::RemoveOverride { key: "k".into() }.requires_elevation());
        assert!(!AgentRequest::ListAdapters.requires_elevation());
        assert!(!AgentRequest::FindConfigKey { correlation_id: "g".into() }.requires_elevation());
    }

    #[test]
    fn test_mismatch_detection() {
        let current = Identifier::normalize("02:11:22:33:44:55").unwrap();
        let ok = SetOutcome {
            method: ApplyMethod::Registry,
            requested: "02-11-22-33-44-55".to_string(),
            current,
        };
        assert!(!ok.is_mismatch());

        let declined = SetOutcome {
            requested: "02-AA-AA-AA-AA-AA".to_string(),
            ..ok.clone()
        };
        assert!(declined.is_mismatch());
    }

    #[test]
    fn test_set_report_shape() {
        let outcome = SetOutcome {
            method: ApplyMethod::Registry,
            requested: "02-11-22-33-44-55".to_string(),
            current: Identifier::normalize("021122334455").unwrap(),
        };
        let json = serde_json::to_value(SetReport::from(&outcome)).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["method"], "Registry");
        assert_eq!(json["requested"], "02-11-22-33-44-55");
        assert_eq!(json["current"], "02-11-22-33-44-55");
    }
}
