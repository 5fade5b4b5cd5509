use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PoserError;
use crate::IDENTIFIER_LEN;

/// Bit 1 of the first octet: set for user-assigned addresses.
const LOCALLY_ADMINISTERED: u8 = 0x02;
/// Bit 0 of the first octet: set for multicast addresses.
const MULTICAST: u8 = 0x01;

// ============================================================================
// IDENTIFIER: a 6-octet hardware address
// ============================================================================

/// A 6-byte hardware address.
///
/// The canonical textual form is 12 uppercase hex digits. `Display` renders the
/// colon-separated form used for humans; [`Identifier::agent_form`] and
/// [`Identifier::bare`] render what the configuration agent expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier([u8; IDENTIFIER_LEN]);

impl Identifier {
    pub const fn from_bytes(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; IDENTIFIER_LEN] {
        self.0
    }

    /// Random locally-administered unicast address from the thread RNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Random locally-administered unicast address from `rng`.
    ///
    /// Bytes 1-5 are fully random; byte 0 keeps its six high bits random and has
    /// bit 1 forced on and bit 0 forced off.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; IDENTIFIER_LEN];
        rng.fill(&mut bytes[..]);
        bytes[0] = (bytes[0] | LOCALLY_ADMINISTERED) & !MULTICAST;
        Self(bytes)
    }

    /// Parse user input: every non-hex character is dropped, the rest must be
    /// exactly 12 hex digits. Vendor (universally administered) addresses are
    /// accepted as-is.
    pub fn normalize(input: &str) -> crate::Result<Self> {
        let hex: String = input
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if hex.len() != IDENTIFIER_LEN * 2 {
            return Err(PoserError::InvalidFormat(format!(
                "expected 12 hex digits (e.g. AA:BB:CC:DD:EE:FF), got {} in '{}'",
                hex.len(),
                input
            )));
        }

        let mut bytes = [0u8; IDENTIFIER_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| PoserError::InvalidFormat(e.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Colon-separated uppercase pairs: `AA:BB:CC:DD:EE:FF`.
    pub fn pretty(&self) -> String {
        self.join(":")
    }

    /// Hyphen-separated uppercase pairs, as the agent's cmdlets print and accept.
    pub fn agent_form(&self) -> String {
        self.join("-")
    }

    /// The 12 hex digits with no separators, as stored in the adapter's
    /// configuration entry.
    pub fn bare(&self) -> String {
        self.join("")
    }

    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & LOCALLY_ADMINISTERED != 0
    }

    pub fn is_unicast(&self) -> bool {
        self.0[0] & MULTICAST == 0
    }

    /// Same address with the multicast bit cleared. Nothing else is touched.
    pub fn with_unicast(self) -> Self {
        let mut bytes = self.0;
        bytes[0] &= !MULTICAST;
        Self(bytes)
    }

    fn join(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Pretty-print loosely formatted text, falling back to the upper-cased input
/// when it is not a valid identifier. Used for readbacks from the agent.
pub fn pretty_or_raw(raw: &str) -> String {
    Identifier::normalize(raw)
        .map(|id| id.pretty())
        .unwrap_or_else(|_| raw.trim().to_uppercase())
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

impl FromStr for Identifier {
    type Err = PoserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pretty())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::normalize(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_identifiers_are_local_unicast() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2048 {
            let id = Identifier::generate_with(&mut rng);
            assert!(id.is_locally_administered(), "{} is not LAA", id);
            assert!(id.is_unicast(), "{} is multicast", id);
        }
        assert!(Identifier::generate().is_locally_administered());
    }

    #[test]
    fn test_generate_keeps_high_bits_random() {
        let mut rng = StdRng::seed_from_u64(42);
        let first_octets: std::collections::HashSet<u8> = (0..512)
            .map(|_| Identifier::generate_with(&mut rng).octets()[0])
            .collect();
        // 64 possible values for byte 0; a fixed prefix would collapse to one.
        assert!(first_octets.len() > 32);
        assert!(first_octets.iter().all(|b| b & 0x03 == 0x02));
    }

    #[test]
    fn test_normalize_ignores_separators_and_case() {
        let expected = Identifier::from_bytes([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        for input in ["aa-bb-cc-dd-ee-ff", "AABBCCDDEEFF", "aa:bb:cc:dd:ee:ff", " aA.bb cc_dd/eE:Ff "] {
            let id = Identifier::normalize(input).unwrap();
            assert_eq!(id, expected, "input {:?}", input);
            assert_eq!(id.bare(), "AABBCCDDEEFF");
        }
    }

    #[test]
    fn test_normalize_rejects_wrong_length() {
        assert!(matches!(
            Identifier::normalize("AA:BB:CC"),
            Err(PoserError::InvalidFormat(_))
        ));
        assert!(matches!(
            Identifier::normalize("AA:BB:CC:DD:EE:FF:00"),
            Err(PoserError::InvalidFormat(_))
        ));
        assert!(matches!(Identifier::normalize(""), Err(PoserError::InvalidFormat(_))));
    }

    #[test]
    fn test_normalize_rejects_non_hex_digit() {
        // 'G' is stripped as a separator, leaving 11 digits
        assert!(matches!(
            Identifier::normalize("AA:BB:CC:DD:EE:FG"),
            Err(PoserError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_normalize_accepts_vendor_addresses() {
        let id = Identifier::normalize("00:1A:2B:3C:4D:5E").unwrap();
        assert!(!id.is_locally_administered());
        let multicast = Identifier::normalize("01:00:5E:00:00:01").unwrap();
        assert!(!multicast.is_unicast());
    }

    #[test]
    fn test_pretty_print_is_stable() {
        for input in ["a8-88-ce-89-59-41", "0123456789ab", "FE:DC:BA:98:76:54"] {
            let once = Identifier::normalize(input).unwrap().pretty();
            let twice = Identifier::normalize(&once).unwrap().pretty();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_display_forms() {
        let id = Identifier::from_bytes([0x0a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f]);
        assert_eq!(id.to_string(), "0A:1B:2C:3D:4E:5F");
        assert_eq!(id.agent_form(), "0A-1B-2C-3D-4E-5F");
        assert_eq!(id.bare(), "0A1B2C3D4E5F");
    }

    #[test]
    fn test_with_unicast_only_clears_bit_zero() {
        let id = Identifier::from_bytes([0xAB, 1, 2, 3, 4, 5]).with_unicast();
        assert_eq!(id.octets(), [0xAA, 1, 2, 3, 4, 5]);
        let vendor = Identifier::from_bytes([0x00, 1, 2, 3, 4, 5]).with_unicast();
        assert_eq!(vendor.octets()[0], 0x00);
    }

    #[test]
    fn test_pretty_or_raw() {
        assert_eq!(pretty_or_raw("aa-bb-cc-dd-ee-ff\r\n"), "AA:BB:CC:DD:EE:FF");
        assert_eq!(pretty_or_raw(" unknown "), "UNKNOWN");
    }

    #[test]
    fn test_serde_uses_pretty_form() {
        let id = Identifier::normalize("aabbccddeeff").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"AA:BB:CC:DD:EE:FF\"");
        let back: Identifier = serde_json::from_str("\"aa-bb-cc-dd-ee-ff\"").unwrap();
        assert_eq!(back, id);
    }
}
