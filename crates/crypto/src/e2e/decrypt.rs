//! Frame-Entschluesselung (Empfangsseite)
//!
//! Ein `MediaDecryptor` pro Remote-Teilnehmer. Nach einem Ratchet-Wechsel
//! bleibt der vorherige Ratchet fuer `transition_expiry` gueltig, damit
//! Frames die noch mit dem alten Schluessel unterwegs sind nicht verloren
//! gehen. Dasselbe gilt beim Verlassen des Passthrough-Modus fuer
//! unverschluesselte Frames.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::e2e::cryptor::FrameDecryptor;
use crate::e2e::frame::{self, ist_verschluesselt};
use crate::e2e::ratchet::KeyRatchetHandle;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{CryptorStats, FrameCipher, StatsZaehler};

/// Referenz-Decryptor
pub struct MediaDecryptor {
    cipher: FrameCipher,
    transition_expiry: Duration,
    zustand: RwLock<DecryptorZustand>,
    stats: StatsZaehler,
}

#[derive(Default)]
struct DecryptorZustand {
    aktiv: Option<KeyRatchetHandle>,
    /// Abgeloeste Ratchets mit Ablaufzeitpunkt, neueste zuerst
    vorherige: Vec<(KeyRatchetHandle, Instant)>,
    passthrough: bool,
    /// Unverschluesselte Frames werden bis zu diesem Zeitpunkt noch akzeptiert
    passthrough_bis: Option<Instant>,
}

impl DecryptorZustand {
    fn aufraeumen(&mut self, jetzt: Instant) {
        self.vorherige.retain(|(_, ablauf)| *ablauf > jetzt);
        if matches!(self.passthrough_bis, Some(bis) if bis <= jetzt) {
            self.passthrough_bis = None;
        }
    }

    fn akzeptiert_klartext(&self, jetzt: Instant) -> bool {
        self.passthrough || matches!(self.passthrough_bis, Some(bis) if bis > jetzt)
    }

    /// Gueltige Ratchets in Probier-Reihenfolge
    fn kandidaten(&self, jetzt: Instant) -> impl Iterator<Item = &KeyRatchetHandle> {
        self.aktiv.iter().chain(
            self.vorherige
                .iter()
                .filter(move |(_, ablauf)| *ablauf > jetzt)
                .map(|(r, _)| r),
        )
    }
}

impl MediaDecryptor {
    pub fn new(cipher: FrameCipher, transition_expiry: Duration) -> Self {
        Self {
            cipher,
            transition_expiry,
            zustand: RwLock::new(DecryptorZustand::default()),
            stats: StatsZaehler::default(),
        }
    }

    /// true wenn ein aktiver Ratchet gesetzt ist
    pub fn has_key_ratchet(&self) -> bool {
        self.zustand.read().aktiv.is_some()
    }

    pub fn is_passthrough_mode(&self) -> bool {
        self.zustand.read().passthrough
    }
}

impl FrameDecryptor for MediaDecryptor {
    fn transition_to_passthrough_mode(&self, passthrough: bool) {
        let jetzt = Instant::now();
        let mut zustand = self.zustand.write();
        zustand.aufraeumen(jetzt);

        if passthrough {
            zustand.passthrough = true;
            zustand.passthrough_bis = None;
        } else if zustand.passthrough {
            zustand.passthrough = false;
            zustand.passthrough_bis = Some(jetzt + self.transition_expiry);
        }
    }

    fn transition_to_key_ratchet(&self, ratchet: KeyRatchetHandle) {
        let jetzt = Instant::now();
        let mut zustand = self.zustand.write();
        zustand.aufraeumen(jetzt);

        if let Some(alt) = zustand.aktiv.take() {
            if Arc::ptr_eq(&alt, &ratchet) {
                zustand.aktiv = Some(alt);
                return;
            }
            zustand
                .vorherige
                .insert(0, (alt, jetzt + self.transition_expiry));
        }
        zustand.aktiv = Some(ratchet);
    }

    fn clear_key_ratchet(&self) {
        let jetzt = Instant::now();
        let mut zustand = self.zustand.write();
        zustand.aufraeumen(jetzt);

        if let Some(alt) = zustand.aktiv.take() {
            zustand
                .vorherige
                .insert(0, (alt, jetzt + self.transition_expiry));
        }
    }

    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let jetzt = Instant::now();
        let zustand = self.zustand.read();

        if !ist_verschluesselt(data) {
            if zustand.akzeptiert_klartext(jetzt) {
                self.stats.passthrough();
                return Ok(data.to_vec());
            }
            self.stats.fehler();
            return Err(CryptoError::UnverschluesselterFrame);
        }

        let parsed = frame::parse(data)?;
        let generation = parsed.generation();
        let mut kandidaten = zustand.kandidaten(jetzt).peekable();

        if kandidaten.peek().is_none() {
            if zustand.passthrough {
                // Ohne jeden Schluessel kann der Marker nur Zufall sein
                self.stats.passthrough();
                return Ok(data.to_vec());
            }
            self.stats.fehlender_schluessel();
            return Err(CryptoError::FehlenderKeyRatchet);
        }

        let mut schluessel_gefunden = false;
        for ratchet in kandidaten {
            let key = match ratchet.key(generation) {
                Ok(key) => key,
                Err(_) => continue,
            };
            schluessel_gefunden = true;
            if let Ok(klartext) = frame::open(self.cipher, key.as_bytes(), &parsed) {
                self.stats.erfolg();
                return Ok(klartext);
            }
        }

        if schluessel_gefunden {
            self.stats.fehler();
            Err(CryptoError::Entschluesselung(
                "kein gueltiger Ratchet passt zum Frame".to_string(),
            ))
        } else {
            self.stats.fehlender_schluessel();
            Err(CryptoError::FehlenderSchluessel { generation })
        }
    }

    fn stats(&self) -> CryptorStats {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for MediaDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let zustand = self.zustand.read();
        f.debug_struct("MediaDecryptor")
            .field("cipher", &self.cipher)
            .field("passthrough", &zustand.passthrough)
            .field("aktiv", &zustand.aktiv.is_some())
            .field("vorherige", &zustand.vorherige.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
