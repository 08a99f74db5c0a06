//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// AEAD-Algorithmus des Referenz-Frame-Kryptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameCipher {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

/// Momentaufnahme der Zaehler eines Encryptors/Decryptors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CryptorStats {
    /// Frames die unveraendert durchgereicht wurden
    pub passthrough: u64,
    /// Erfolgreich ver-/entschluesselte Frames
    pub erfolg: u64,
    /// Fehlgeschlagene Versuche (AEAD, Format)
    pub fehler: u64,
    /// Versuche ohne passenden Schluessel
    pub fehlender_schluessel: u64,
}

/// Lock-freie Zaehler hinter `CryptorStats` (werden aus Audio-Threads erhoeht)
#[derive(Debug, Default)]
pub(crate) struct StatsZaehler {
    passthrough: AtomicU64,
    erfolg: AtomicU64,
    fehler: AtomicU64,
    fehlender_schluessel: AtomicU64,
}

impl StatsZaehler {
    pub(crate) fn passthrough(&self) {
        self.passthrough.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn erfolg(&self) {
        self.erfolg.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fehler(&self) {
        self.fehler.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fehlender_schluessel(&self) {
        self.fehlender_schluessel.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CryptorStats {
        CryptorStats {
            passthrough: self.passthrough.load(Ordering::Relaxed),
            erfolg: self.erfolg.load(Ordering::Relaxed),
            fehler: self.fehler.load(Ordering::Relaxed),
            fehlender_schluessel: self.fehlender_schluessel.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_bytes_debug_ist_redacted() {
        let s = SecretBytes::new(vec![7u8; 32]);
        assert_eq!(format!("{s:?}"), "SecretBytes([REDACTED] 32 bytes)");
        assert_eq!(s.len(), 32);
    }

    #[test]
    fn stats_zaehlen() {
        let z = StatsZaehler::default();
        z.erfolg();
        z.erfolg();
        z.passthrough();
        z.fehlender_schluessel();
        let s = z.snapshot();
        assert_eq!(s.erfolg, 2);
        assert_eq!(s.passthrough, 1);
        assert_eq!(s.fehler, 0);
        assert_eq!(s.fehlender_schluessel, 1);
    }

    #[test]
    fn frame_cipher_aus_toml_namen() {
        #[derive(Deserialize)]
        struct W {
            c: FrameCipher,
        }
        let w: W = toml::from_str(r#"c = "chacha20poly1305""#).unwrap();
        assert_eq!(w.c, FrameCipher::ChaCha20Poly1305);
    }
}
