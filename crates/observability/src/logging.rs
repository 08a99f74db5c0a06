//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Konfiguration):
//! - `VOX_LOG_LEVEL`: Filter im `EnvFilter`-Format, z.B. `info` oder
//!   `voxmls_crypto=debug`, Standard: info
//! - `VOX_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Die Session loggt Transitions mit den Feldern `transition_id`, `version`,
//! `teilnehmer` und `epoch`.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "VOX_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "VOX_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!("Unbekanntes Log-Format '{other}'")),
        }
    }
}

/// Wirksame Logging-Optionen nach Auswertung der Umgebung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptionen {
    pub filter: String,
    pub format: LogFormat,
}

/// Kombiniert Konfiguration und Umgebungswerte; Umgebung gewinnt.
///
/// Ungueltige Umgebungswerte werden mit einer Warnung auf stderr ignoriert,
/// da der Subscriber zu diesem Zeitpunkt noch nicht laeuft.
pub fn optionen_aufloesen(
    level: &str,
    format: LogFormat,
    env_level: Option<String>,
    env_format: Option<String>,
) -> LoggingOptionen {
    let filter = env_level
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| level.to_string());

    let format = match env_format {
        Some(f) => f.parse().unwrap_or_else(|e| {
            eprintln!("{ENV_LOG_FORMAT} ignoriert: {e}");
            format
        }),
        None => format,
    };

    LoggingOptionen { filter, format }
}

/// Initialisiert das Logging-System.
///
/// Liest `VOX_LOG_LEVEL` und `VOX_LOG_FORMAT` aus der Umgebung. Ein
/// ungueltiger Filter faellt auf `info` zurueck. Fehler nur wenn bereits
/// ein globaler Subscriber installiert ist.
pub fn logging_initialisieren(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let optionen = optionen_aufloesen(
        level,
        format,
        std::env::var(ENV_LOG_LEVEL).ok(),
        std::env::var(ENV_LOG_FORMAT).ok(),
    );
    let filter = EnvFilter::try_new(&optionen.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let ergebnis = match optionen.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| anyhow::anyhow!("Logging bereits initialisiert: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsen() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn ohne_umgebung_gilt_konfiguration() {
        let o = optionen_aufloesen("debug", LogFormat::Json, None, None);
        assert_eq!(o.filter, "debug");
        assert_eq!(o.format, LogFormat::Json);
    }

    #[test]
    fn umgebung_hat_vorrang() {
        let o = optionen_aufloesen(
            "info",
            LogFormat::Text,
            Some("voxmls_crypto=trace".into()),
            Some("json".into()),
        );
        assert_eq!(o.filter, "voxmls_crypto=trace");
        assert_eq!(o.format, LogFormat::Json);
    }

    #[test]
    fn ungueltige_umgebung_wird_ignoriert() {
        let o = optionen_aufloesen("warn", LogFormat::Text, Some("  ".into()), Some("xml".into()));
        assert_eq!(o.filter, "warn");
        assert_eq!(o.format, LogFormat::Text);
    }

    #[test]
    fn zweite_initialisierung_ist_fehler() {
        // Erster Aufruf kann fehlschlagen wenn ein anderer Test schon initialisiert hat
        let _ = logging_initialisieren("info", LogFormat::Text);
        assert!(logging_initialisieren("info", LogFormat::Text).is_err());
    }
}
