//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler der Medien-Ebene (Frame-Ver-/Entschluesselung, Key-Ableitung)
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Kein Key-Ratchet aktiv")]
    FehlenderKeyRatchet,

    #[error("Kein Schluessel fuer Generation {generation}")]
    FehlenderSchluessel { generation: u8 },

    #[error("Nonce-Zaehler erschoepft (Generation {generation})")]
    NonceErschoepft { generation: u8 },

    #[error("Unverschluesselter Frame ausserhalb des Passthrough-Modus")]
    UnverschluesselterFrame,

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Fehler beim Senden einer Nachricht an das Voice-Gateway
///
/// Wird nur geloggt; der lokale Zustand bleibt gueltig.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway-Verbindung geschlossen")]
    Geschlossen,

    #[error("Send-Queue voll")]
    QueueVoll,

    #[error("Senden fehlgeschlagen: {0}")]
    Senden(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = CryptoError::FehlenderSchluessel { generation: 3 };
        assert_eq!(e.to_string(), "Kein Schluessel fuer Generation 3");
        assert_eq!(GatewayError::QueueVoll.to_string(), "Send-Queue voll");
    }
}
