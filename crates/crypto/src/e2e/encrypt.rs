//! Frame-Verschluesselung (Sendeseite)
//!
//! Verschluesselt die eigenen Opus-Frames mit dem Key-Ratchet des eigenen
//! Teilnehmers. Der Nonce-Zaehler beginnt bei jedem neuen Ratchet wieder bei
//! 0; sein oberstes Byte waehlt die Ratchet-Generation.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use voxmls_core::Codec;

use crate::e2e::cryptor::FrameEncryptor;
use crate::e2e::frame::{self, generation_of};
use crate::e2e::ratchet::KeyRatchetHandle;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{CryptorStats, FrameCipher, StatsZaehler};

/// Referenz-Encryptor
pub struct MediaEncryptor {
    cipher: FrameCipher,
    zustand: Mutex<EncryptorZustand>,
    codecs: RwLock<HashMap<u32, Codec>>,
    stats: StatsZaehler,
}

struct EncryptorZustand {
    passthrough: bool,
    ratchet: Option<KeyRatchetHandle>,
    /// Naechster Nonce-Zaehler; None wenn der Zaehler erschoepft ist
    naechster_zaehler: Option<u32>,
}

impl MediaEncryptor {
    /// Neuer Encryptor ohne Ratchet, nicht im Passthrough
    pub fn new(cipher: FrameCipher) -> Self {
        Self {
            cipher,
            zustand: Mutex::new(EncryptorZustand {
                passthrough: false,
                ratchet: None,
                naechster_zaehler: Some(0),
            }),
            codecs: RwLock::new(HashMap::new()),
            stats: StatsZaehler::default(),
        }
    }

    fn codec_fuer(&self, ssrc: u32) -> Codec {
        self.codecs.read().get(&ssrc).copied().unwrap_or_default()
    }

    /// Reserviert den naechsten Nonce-Zaehler samt zugehoerigem Ratchet
    fn naechster_nonce(&self) -> CryptoResult<Option<(KeyRatchetHandle, u32)>> {
        let mut zustand = self.zustand.lock();
        if zustand.passthrough {
            return Ok(None);
        }
        let ratchet = zustand
            .ratchet
            .clone()
            .ok_or(CryptoError::FehlenderKeyRatchet)?;
        let zaehler = zustand
            .naechster_zaehler
            .ok_or(CryptoError::NonceErschoepft {
                generation: u8::MAX,
            })?;
        zustand.naechster_zaehler = zaehler.checked_add(1);

        if zaehler > 0 && generation_of(zaehler) != generation_of(zaehler - 1) {
            // Vorherige Generation wird nie wieder zum Senden gebraucht
            ratchet.delete_key(generation_of(zaehler - 1));
        }
        Ok(Some((ratchet, zaehler)))
    }
}

impl FrameEncryptor for MediaEncryptor {
    fn set_passthrough_mode(&self, passthrough: bool) {
        self.zustand.lock().passthrough = passthrough;
    }

    fn set_key_ratchet(&self, ratchet: KeyRatchetHandle) {
        let mut zustand = self.zustand.lock();
        zustand.ratchet = Some(ratchet);
        zustand.naechster_zaehler = Some(0);
    }

    fn clear_key_ratchet(&self) {
        let mut zustand = self.zustand.lock();
        zustand.ratchet = None;
        zustand.naechster_zaehler = Some(0);
    }

    fn is_passthrough_mode(&self) -> bool {
        self.zustand.lock().passthrough
    }

    fn has_key_ratchet(&self) -> bool {
        self.zustand.lock().ratchet.is_some()
    }

    fn assign_ssrc_to_codec(&self, ssrc: u32, codec: Codec) {
        self.codecs.write().insert(ssrc, codec);
    }

    fn encrypt(&self, ssrc: u32, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let (ratchet, zaehler) = match self.naechster_nonce() {
            Ok(Some(nonce)) => nonce,
            Ok(None) => {
                self.stats.passthrough();
                return Ok(plaintext.to_vec());
            }
            Err(e @ CryptoError::FehlenderKeyRatchet) => {
                self.stats.fehlender_schluessel();
                return Err(e);
            }
            Err(e) => {
                self.stats.fehler();
                return Err(e);
            }
        };

        if self.codec_fuer(ssrc) == Codec::Unknown {
            self.stats.fehler();
            return Err(CryptoError::Verschluesselung(format!(
                "SSRC {ssrc} ohne bekannten Codec"
            )));
        }

        let key = match ratchet.key(generation_of(zaehler)) {
            Ok(key) => key,
            Err(e) => {
                self.stats.fehlender_schluessel();
                return Err(e);
            }
        };

        let result = frame::seal(self.cipher, key.as_bytes(), zaehler, plaintext);
        match &result {
            Ok(_) => self.stats.erfolg(),
            Err(_) => self.stats.fehler(),
        }
        result
    }

    fn stats(&self) -> CryptorStats {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for MediaEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let zustand = self.zustand.lock();
        f.debug_struct("MediaEncryptor")
            .field("cipher", &self.cipher)
            .field("passthrough", &zustand.passthrough)
            .field("ratchet", &zustand.ratchet.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
