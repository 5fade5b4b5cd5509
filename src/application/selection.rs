use tracing::{debug, warn};

use crate::domain::entities::{select_default_adapter, Adapter};
use crate::domain::ports::agent::AdapterConfigAgent;
use crate::error::PoserError;

/// How the adapter for a command was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Flag,
    Config,
    Heuristic,
}

/// Find the adapter a command should act on.
///
/// An explicit name must exist. A configured default that no longer exists is
/// skipped with a warning. Otherwise the wireless/up/non-virtual heuristic picks.
pub async fn resolve_adapter(
    agent: &(dyn AdapterConfigAgent + Send + Sync),
    requested: Option<&str>,
    configured: Option<&str>,
) -> crate::Result<(Adapter, SelectionSource)> {
    let adapters = agent.list_adapters().await?;
    pick_adapter(&adapters, requested, configured)
}

pub fn pick_adapter(
    adapters: &[Adapter],
    requested: Option<&str>,
    configured: Option<&str>,
) -> crate::Result<(Adapter, SelectionSource)> {
    if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
        return find_by_name(adapters, name)
            .map(|a| (a.clone(), SelectionSource::Flag))
            .ok_or_else(|| PoserError::AdapterNotFound(name.to_string()));
    }

    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        match find_by_name(adapters, name) {
            Some(adapter) => return Ok((adapter.clone(), SelectionSource::Config)),
            None => warn!(adapter = name, "configured default adapter not present, guessing instead"),
        }
    }

    let adapter = select_default_adapter(adapters)
        .ok_or_else(|| PoserError::AdapterNotFound("no network adapters reported".to_string()))?;
    debug!(adapter = %adapter.name, score = adapter.selection_score(), "default adapter selected");
    Ok((adapter.clone(), SelectionSource::Heuristic))
}

/// Exact display-name match first, then case-insensitive.
fn find_by_name<'a>(adapters: &'a [Adapter], name: &str) -> Option<&'a Adapter> {
    adapters
        .iter()
        .find(|a| a.name == name)
        .or_else(|| adapters.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(name: &str, description: &str, status: &str) -> Adapter {
        Adapter {
            name: name.to_string(),
            description: description.to_string(),
            status: status.to_string(),
            identifier: "00-11-22-33-44-55".to_string(),
            correlation_id: format!("{{{}}}", name),
        }
    }

    fn host() -> Vec<Adapter> {
        vec![
            adapter("Ethernet", "Intel(R) Ethernet Connection", "Up"),
            adapter("Wi-Fi", "Intel(R) Wi-Fi 6 AX201", "Up"),
            adapter("vEthernet (WSL)", "Hyper-V Virtual Ethernet Adapter", "Up"),
        ]
    }

    #[test]
    fn test_flag_wins_and_must_exist() {
        let (picked, source) = pick_adapter(&host(), Some("ethernet"), Some("Wi-Fi")).unwrap();
        assert_eq!(picked.name, "Ethernet");
        assert_eq!(source, SelectionSource::Flag);

        let err = pick_adapter(&host(), Some("Bluetooth"), None).unwrap_err();
        assert!(matches!(err, PoserError::AdapterNotFound(ref n) if n == "Bluetooth"));
    }

    #[test]
    fn test_config_default_then_heuristic() {
        let (picked, source) = pick_adapter(&host(), None, Some("Ethernet")).unwrap();
        assert_eq!((picked.name.as_str(), source), ("Ethernet", SelectionSource::Config));

        let (picked, source) = pick_adapter(&host(), None, Some("Gone")).unwrap();
        assert_eq!((picked.name.as_str(), source), ("Wi-Fi", SelectionSource::Heuristic));

        let (picked, _) = pick_adapter(&host(), Some("  "), None).unwrap();
        assert_eq!(picked.name, "Wi-Fi");
    }

    #[test]
    fn test_empty_host_is_not_found() {
        assert!(matches!(
            pick_adapter(&[], None, None),
            Err(PoserError::AdapterNotFound(_))
        ));
    }
}
