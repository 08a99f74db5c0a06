//! Session-Konfiguration
//!
//! Wird vom Einbetter aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass eine Session ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use voxmls_core::ProtocolVersion;
use voxmls_observability::LogFormat;

use crate::e2e::MediaCryptorFactory;
use crate::types::FrameCipher;

/// Vollstaendige Session-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Gruppenverschluesselung an/aus, Versions-Obergrenze
    pub protokoll: ProtokollEinstellungen,
    /// Referenz-Frame-Kryptor
    pub kryptor: KryptorEinstellungen,
    /// Event-Queue des Session-Actors
    pub actor: ActorEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Protokoll-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtokollEinstellungen {
    /// false = nur Passthrough-Sessions (Version 0)
    pub aktiviert: bool,
    /// Obergrenze fuer die dem Gateway angebotene Protokollversion
    pub max_version: u16,
}

impl Default for ProtokollEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            max_version: u16::MAX,
        }
    }
}

/// Einstellungen des Referenz-Frame-Kryptors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KryptorEinstellungen {
    /// "aes256gcm" oder "chacha20poly1305"
    pub algorithmus: FrameCipher,
    /// Wie lange alte Schluessel nach einem Wechsel gueltig bleiben
    pub transition_expiry_ms: u64,
}

impl Default for KryptorEinstellungen {
    fn default() -> Self {
        Self {
            algorithmus: FrameCipher::default(),
            transition_expiry_ms: 10_000,
        }
    }
}

/// Einstellungen des Session-Actors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorEinstellungen {
    /// Kapazitaet der Event- und Ausgangs-Queues
    pub queue_groesse: usize,
}

impl Default for ActorEinstellungen {
    fn default() -> Self {
        Self { queue_groesse: 64 }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: LogFormat,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl SessionConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Obergrenze als `ProtocolVersion`
    pub fn max_version(&self) -> ProtocolVersion {
        ProtocolVersion(self.protokoll.max_version)
    }

    pub fn transition_expiry(&self) -> Duration {
        Duration::from_millis(self.kryptor.transition_expiry_ms)
    }

    /// Installiert den globalen tracing-Subscriber gemaess `[logging]`.
    /// `VOX_LOG_LEVEL` und `VOX_LOG_FORMAT` haben Vorrang.
    pub fn logging_initialisieren(&self) -> anyhow::Result<()> {
        voxmls_observability::logging_initialisieren(&self.logging.level, self.logging.format)
    }

    /// Factory fuer den Referenz-Kryptor gemaess `[kryptor]`
    pub fn cryptor_factory(&self) -> MediaCryptorFactory {
        MediaCryptorFactory::new(self.kryptor.algorithmus, self.transition_expiry())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = SessionConfig::default();
        assert!(cfg.protokoll.aktiviert);
        assert_eq!(cfg.max_version(), ProtocolVersion(u16::MAX));
        assert_eq!(cfg.kryptor.algorithmus, FrameCipher::Aes256Gcm);
        assert_eq!(cfg.transition_expiry(), Duration::from_secs(10));
        assert_eq!(cfg.actor.queue_groesse, 64);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [protokoll]
            max_version = 1

            [kryptor]
            algorithmus = "chacha20poly1305"

            [logging]
            format = "json"
        "#;
        let cfg: SessionConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_version(), ProtocolVersion(1));
        assert_eq!(cfg.kryptor.algorithmus, FrameCipher::ChaCha20Poly1305);
        // Nicht angegebene Felder behalten Standardwerte
        assert!(cfg.protokoll.aktiviert);
        assert_eq!(cfg.kryptor.transition_expiry_ms, 10_000);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = SessionConfig::laden("/nicht/vorhanden/voxmls.toml").unwrap();
        assert_eq!(cfg.actor.queue_groesse, 64);
    }

    #[test]
    fn kaputte_datei_ist_fehler() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("voxmls.toml");
        std::fs::write(&pfad, "[protokoll\naktiviert = ja").unwrap();
        assert!(SessionConfig::laden(pfad.to_str().unwrap()).is_err());
    }

    #[test]
    fn datei_wird_gelesen() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("voxmls.toml");
        std::fs::write(&pfad, "[actor]\nqueue_groesse = 8\n").unwrap();
        let cfg = SessionConfig::laden(pfad.to_str().unwrap()).unwrap();
        assert_eq!(cfg.actor.queue_groesse, 8);
    }

    #[test]
    fn factory_uebernimmt_kryptor_einstellungen() {
        let mut cfg = SessionConfig::default();
        cfg.kryptor.transition_expiry_ms = 250;
        let factory = cfg.cryptor_factory();
        assert_eq!(factory.transition_expiry, Duration::from_millis(250));
        assert_eq!(factory.cipher, FrameCipher::Aes256Gcm);
    }
}
