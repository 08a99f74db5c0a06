//! Fehlertypen fuer voxmls
//!
//! Zentraler Fehler-Enum fuer die Kontroll-Ebene. Medienfehler
//! (Ver-/Entschluesselung) leben im Krypto-Crate.

use thiserror::Error;

use crate::types::ChannelId;

/// Globaler Result-Alias fuer voxmls
pub type VoxResult<T> = std::result::Result<T, VoxError>;

/// Fehler der Kontroll-Ebene
#[derive(Debug, Error)]
pub enum VoxError {
    // --- Session ---
    #[error("Kanal bereits gebunden: aktuell={aktuell}, angefragt={angefragt}")]
    KanalBereitsGesetzt {
        aktuell: ChannelId,
        angefragt: ChannelId,
    },

    #[error("Session beendet")]
    SessionBeendet,

    // --- Protokoll ---
    #[error("Ungueltige Gateway-Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Unbekannter Opcode: {0}")]
    UnbekannterOpcode(u8),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VoxError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler auf ein fehlerhaftes Gateway-Paket
    /// zurueckgeht (Paket verwerfen, Session laeuft weiter)
    pub fn ist_protokollfehler(&self) -> bool {
        matches!(
            self,
            Self::UngueltigeNachricht(_) | Self::UnbekannterOpcode(_) | Self::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = VoxError::KanalBereitsGesetzt {
            aktuell: ChannelId(1),
            angefragt: ChannelId(2),
        };
        assert_eq!(
            e.to_string(),
            "Kanal bereits gebunden: aktuell=channel:1, angefragt=channel:2"
        );
    }

    #[test]
    fn protokollfehler_erkennung() {
        assert!(VoxError::UnbekannterOpcode(99).ist_protokollfehler());
        assert!(VoxError::UngueltigeNachricht("x".into()).ist_protokollfehler());
        assert!(!VoxError::SessionBeendet.ist_protokollfehler());
        assert!(!VoxError::intern("kaputt").ist_protokollfehler());
    }
}
