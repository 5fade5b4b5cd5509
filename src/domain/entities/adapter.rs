use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// ADAPTER RECORD
// ============================================================================

/// A network adapter as reported by the configuration agent.
///
/// Records are transient: re-fetch them for every operation. `name` can change
/// or collide across reconfiguration; `correlation_id` is the stable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adapter {
    pub name: String,
    pub description: String,
    pub status: String,
    /// Currently active address in whatever form the OS printed it.
    pub identifier: String,
    pub correlation_id: String,
}

impl Adapter {
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("up")
    }

    pub fn looks_wireless(&self) -> bool {
        wireless_pattern().map_or(false, |re| re.is_match(&self.haystack()))
    }

    pub fn looks_virtual(&self) -> bool {
        virtual_pattern().map_or(false, |re| re.is_match(&self.haystack()))
    }

    /// Preference score used when choosing an adapter automatically.
    pub fn selection_score(&self) -> i32 {
        let mut score = 0;
        if self.looks_wireless() {
            score += 5;
        }
        if self.is_up() {
            score += 3;
        }
        if self.looks_virtual() {
            score -= 6;
        }
        score
    }

    fn haystack(&self) -> String {
        format!("{} {}", self.description, self.name).to_lowercase()
    }
}

fn wireless_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b(wi-?fi|wireless|wlan|802\.11)\b").ok())
        .as_ref()
}

fn virtual_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"\b(vpn|wireguard|openvpn|anyconnect|nord|proton|zerotier|hamachi|tap|tun|wan miniport|hyper-v|vmware|virtualbox|virtual|tunnel|lynx)\b",
            )
            .ok()
        })
        .as_ref()
}

/// Pick the adapter to operate on when the user did not name one.
///
/// Highest [`Adapter::selection_score`] wins, ties go to the first listed. With
/// nothing above the floor, fall back to the first adapter that is up, then
/// to the first adapter at all.
pub fn select_default_adapter(adapters: &[Adapter]) -> Option<&Adapter> {
    let mut best: Option<&Adapter> = None;
    let mut best_score = i32::MIN;

    for adapter in adapters {
        let score = adapter.selection_score();
        if score > best_score {
            best_score = score;
            best = Some(adapter);
        }
    }

    best.or_else(|| adapters.iter().find(|a| a.is_up()))
        .or_else(|| adapters.first())
}
