//! Gemeinsame Identifikationstypen fuer voxmls
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Teilnehmer- und
//! Kanal-IDs sind Snowflakes (u64) wie sie das Voice-Gateway vergibt.

use serde::{Deserialize, Serialize};

/// Reservierte Transition-ID fuer die Init-Transition (synchron, nie gestaged)
pub const INIT_TRANSITION_ID: TransitionId = TransitionId(0);

/// Protokollversion 0 = Protokoll deaktiviert (Passthrough)
pub const DISABLED_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion(0);

/// Erwartete Epoch einer frisch gebootstrappten MLS-Gruppe
pub const NEW_GROUP_EPOCH: Epoch = Epoch(1);

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// Stabile ID eines Gruppenmitglieds (eigener Client oder Remote-Teilnehmer)
///
/// `Display` liefert die dezimale Darstellung; genau dieser String wird an
/// die Group-Engine uebergeben (Credential-Identitaet, Roster-Abgleich).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Gibt den inneren Snowflake zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ParticipantId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

// ---------------------------------------------------------------------------
// ChannelId
// ---------------------------------------------------------------------------

/// ID des Voice-Kanals (Gruppen-Scope einer Session)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Gibt den inneren Snowflake zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Protokoll-Zahlen
// ---------------------------------------------------------------------------

/// Version des Gruppen-Protokolls (0 = deaktiviert)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u16);

impl ProtocolVersion {
    /// true wenn diese Version Passthrough bedeutet
    pub fn is_disabled(&self) -> bool {
        *self == DISABLED_PROTOCOL_VERSION
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Vom Gateway vergebene ID eines Versionswechsels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionId(pub u16);

impl TransitionId {
    /// true fuer die synchron angewendete Init-Transition
    pub fn is_init(&self) -> bool {
        *self == INIT_TRANSITION_ID
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// MLS-Epoch (1 = neue Gruppe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(pub i64);

impl Epoch {
    /// true fuer die Epoch einer frisch gebootstrappten Gruppe
    pub fn is_new_group(&self) -> bool {
        *self == NEW_GROUP_EPOCH
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Medien-Codec eines SSRC (bestimmt die Frame-Behandlung im Encryptor)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    Unknown,
    #[default]
    Opus,
    Vp8,
    Vp9,
    H264,
    H265,
    Av1,
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Codec::Unknown => "unknown",
            Codec::Opus => "opus",
            Codec::Vp8 => "vp8",
            Codec::Vp9 => "vp9",
            Codec::H264 => "h264",
            Codec::H265 => "h265",
            Codec::Av1 => "av1",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_display_ist_dezimal() {
        let id = ParticipantId(1234567890123);
        assert_eq!(id.to_string(), "1234567890123");
        let zurueck: ParticipantId = "1234567890123".parse().unwrap();
        assert_eq!(zurueck, id);
    }

    #[test]
    fn reservierte_werte() {
        assert!(INIT_TRANSITION_ID.is_init());
        assert!(!TransitionId(5).is_init());
        assert!(DISABLED_PROTOCOL_VERSION.is_disabled());
        assert!(!ProtocolVersion(1).is_disabled());
        assert!(NEW_GROUP_EPOCH.is_new_group());
        assert!(!Epoch(2).is_new_group());
    }

    #[test]
    fn ids_sind_serde_transparent() {
        let json = serde_json::to_string(&ParticipantId(42)).unwrap();
        assert_eq!(json, "42");
        let v: ProtocolVersion = serde_json::from_str("1").unwrap();
        assert_eq!(v, ProtocolVersion(1));
    }

    #[test]
    fn codec_standard_ist_opus() {
        assert_eq!(Codec::default(), Codec::Opus);
        assert_eq!(Codec::H264.to_string(), "h264");
    }
}
