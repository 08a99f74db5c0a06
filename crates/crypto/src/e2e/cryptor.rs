//! Schnittstellen zwischen Session-Koordinator und Frame-Kryptor
//!
//! Der Koordinator schaltet nur Modi um (Passthrough an/aus, neuer Ratchet);
//! die eigentliche Ver-/Entschluesselung laeuft aus den Audio-Threads
//! gleichzeitig dazu. Implementierungen muessen daher intern synchronisiert
//! sein (`&self` ueberall).

use std::time::Duration;

use voxmls_core::Codec;

use crate::e2e::decrypt::MediaDecryptor;
use crate::e2e::encrypt::MediaEncryptor;
use crate::e2e::ratchet::KeyRatchetHandle;
use crate::error::CryptoResult;
use crate::types::{CryptorStats, FrameCipher};

/// Standard-Fenster in dem alte Schluessel nach einem Wechsel gueltig bleiben
pub const DEFAULT_TRANSITION_EXPIRY: Duration = Duration::from_secs(10);

/// Sendeseite: genau einer pro Session (eigener Client)
pub trait FrameEncryptor: Send + Sync + 'static {
    /// Schaltet den Passthrough-Modus (Frames unveraendert senden)
    fn set_passthrough_mode(&self, passthrough: bool);

    /// Aktiviert einen neuen Key-Ratchet
    fn set_key_ratchet(&self, ratchet: KeyRatchetHandle);

    /// Verwirft den aktiven Ratchet; `encrypt` schlaegt danach fehl
    fn clear_key_ratchet(&self);

    fn is_passthrough_mode(&self) -> bool;

    fn has_key_ratchet(&self) -> bool;

    /// Ordnet einem SSRC einen Codec zu
    fn assign_ssrc_to_codec(&self, ssrc: u32, codec: Codec);

    /// Verschluesselt einen Frame des angegebenen SSRC
    fn encrypt(&self, ssrc: u32, frame: &[u8]) -> CryptoResult<Vec<u8>>;

    fn stats(&self) -> CryptorStats;
}

/// Empfangsseite: einer pro Remote-Teilnehmer
pub trait FrameDecryptor: Send + Sync + 'static {
    /// Wechselt in den/aus dem Passthrough-Modus
    fn transition_to_passthrough_mode(&self, passthrough: bool);

    /// Wechselt auf einen neuen Key-Ratchet
    fn transition_to_key_ratchet(&self, ratchet: KeyRatchetHandle);

    /// Verwirft den aktiven Ratchet; er bleibt nur noch fuer das
    /// Uebergangsfenster gueltig
    fn clear_key_ratchet(&self);

    /// Entschluesselt einen empfangenen Frame
    fn decrypt(&self, frame: &[u8]) -> CryptoResult<Vec<u8>>;

    fn stats(&self) -> CryptorStats;
}

/// Erzeugt Encryptor und Decryptoren fuer eine Session
pub trait CryptorFactory: Send + 'static {
    type Encryptor: FrameEncryptor;
    type Decryptor: FrameDecryptor;

    fn encryptor(&self) -> Self::Encryptor;

    fn decryptor(&self) -> Self::Decryptor;
}

/// Factory fuer den Referenz-Kryptor
#[derive(Debug, Clone, Copy)]
pub struct MediaCryptorFactory {
    pub cipher: FrameCipher,
    pub transition_expiry: Duration,
}

impl MediaCryptorFactory {
    pub fn new(cipher: FrameCipher, transition_expiry: Duration) -> Self {
        Self {
            cipher,
            transition_expiry,
        }
    }
}

impl Default for MediaCryptorFactory {
    fn default() -> Self {
        Self::new(FrameCipher::default(), DEFAULT_TRANSITION_EXPIRY)
    }
}

impl CryptorFactory for MediaCryptorFactory {
    type Encryptor = MediaEncryptor;
    type Decryptor = MediaDecryptor;

    fn encryptor(&self) -> MediaEncryptor {
        MediaEncryptor::new(self.cipher)
    }

    fn decryptor(&self) -> MediaDecryptor {
        MediaDecryptor::new(self.cipher, self.transition_expiry)
    }
}
