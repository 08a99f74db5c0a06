//! Media-Pfad einer Session
//!
//! `MediaHandle` wird an die Audio-Threads gegeben. Er teilt Encryptor und
//! Decryptor-Map mit der `GroupSession`, haelt aber keine Referenz auf die
//! Session selbst: Ratchet-Wechsel im Control-Plane und Frames im Media-Pfad
//! laufen gleichzeitig, synchronisiert werden nur die Kryptoren intern.

use dashmap::DashMap;
use std::sync::Arc;

use voxmls_core::{Codec, ParticipantId};

use crate::e2e::{FrameDecryptor, FrameEncryptor};
use crate::error::CryptoResult;
use crate::types::CryptorStats;

/// Decryptoren pro Remote-Teilnehmer, geteilt zwischen Session und Media-Pfad
pub(crate) type DecryptorMap<D> = Arc<DashMap<ParticipantId, Arc<D>>>;

/// Objekt-sichere Sicht auf den Media-Pfad (fuer `VoiceSession`)
pub trait MediaPfad: Send + Sync {
    /// Verschluesselt einen eigenen Frame
    fn encrypt(&self, ssrc: u32, frame: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Entschluesselt einen Frame eines Remote-Teilnehmers
    fn decrypt(&self, sender: ParticipantId, frame: &[u8]) -> CryptoResult<Vec<u8>>;

    fn assign_ssrc_to_codec(&self, ssrc: u32, codec: Codec);
}

/// Cloneable Handle auf Encryptor und Decryptoren einer `GroupSession`
pub struct MediaHandle<E, D> {
    encryptor: Arc<E>,
    decryptors: DecryptorMap<D>,
}

impl<E, D> Clone for MediaHandle<E, D> {
    fn clone(&self) -> Self {
        Self {
            encryptor: Arc::clone(&self.encryptor),
            decryptors: Arc::clone(&self.decryptors),
        }
    }
}

impl<E: FrameEncryptor, D: FrameDecryptor> MediaHandle<E, D> {
    pub(crate) fn new(encryptor: Arc<E>, decryptors: DecryptorMap<D>) -> Self {
        Self {
            encryptor,
            decryptors,
        }
    }

    /// Verschluesselt einen eigenen Frame im aktuellen Modus
    pub fn encrypt(&self, ssrc: u32, frame: &[u8]) -> CryptoResult<Vec<u8>> {
        self.encryptor.encrypt(ssrc, frame)
    }

    /// Entschluesselt einen Frame von `sender`
    ///
    /// Frames unbekannter Teilnehmer werden unveraendert durchgereicht.
    pub fn decrypt(&self, sender: ParticipantId, frame: &[u8]) -> CryptoResult<Vec<u8>> {
        // Arc klonen, damit der DashMap-Shard waehrend der AEAD nicht gesperrt bleibt
        let decryptor = self.decryptors.get(&sender).map(|d| Arc::clone(d.value()));
        match decryptor {
            Some(d) => d.decrypt(frame),
            None => {
                tracing::trace!(teilnehmer = %sender, "Kein Decryptor – Frame unveraendert");
                Ok(frame.to_vec())
            }
        }
    }

    pub fn assign_ssrc_to_codec(&self, ssrc: u32, codec: Codec) {
        self.encryptor.assign_ssrc_to_codec(ssrc, codec);
    }

    /// true wenn der eigene Encryptor unverschluesselt sendet
    pub fn is_passthrough(&self) -> bool {
        self.encryptor.is_passthrough_mode()
    }

    pub fn encryptor_stats(&self) -> CryptorStats {
        self.encryptor.stats()
    }

    /// Zaehler des Decryptors eines Teilnehmers
    pub fn decryptor_stats(&self, sender: ParticipantId) -> Option<CryptorStats> {
        self.decryptors.get(&sender).map(|d| d.value().stats())
    }
}

impl<E: FrameEncryptor, D: FrameDecryptor> MediaPfad for MediaHandle<E, D> {
    fn encrypt(&self, ssrc: u32, frame: &[u8]) -> CryptoResult<Vec<u8>> {
        MediaHandle::encrypt(self, ssrc, frame)
    }

    fn decrypt(&self, sender: ParticipantId, frame: &[u8]) -> CryptoResult<Vec<u8>> {
        MediaHandle::decrypt(self, sender, frame)
    }

    fn assign_ssrc_to_codec(&self, ssrc: u32, codec: Codec) {
        MediaHandle::assign_ssrc_to_codec(self, ssrc, codec)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2e::{HashRatchet, MediaDecryptor, MediaEncryptor, DEFAULT_TRANSITION_EXPIRY};
    use crate::types::{FrameCipher, SecretBytes};
    use std::thread;

    fn handle() -> MediaHandle<MediaEncryptor, MediaDecryptor> {
        MediaHandle::new(
            Arc::new(MediaEncryptor::new(FrameCipher::Aes256Gcm)),
            Arc::new(DashMap::new()),
        )
    }

    #[test]
    fn unbekannter_sender_wird_durchgereicht() {
        let media = handle();
        let out = media.decrypt(ParticipantId(99), b"roh").unwrap();
        assert_eq!(out, b"roh");
        assert!(media.decryptor_stats(ParticipantId(99)).is_none());
    }

    #[test]
    fn bekannter_sender_nutzt_seinen_decryptor() {
        let media = handle();
        let dec = Arc::new(MediaDecryptor::new(
            FrameCipher::Aes256Gcm,
            DEFAULT_TRANSITION_EXPIRY,
        ));
        dec.transition_to_passthrough_mode(true);
        media.decryptors.insert(ParticipantId(1), Arc::clone(&dec));

        assert_eq!(media.decrypt(ParticipantId(1), b"klar").unwrap(), b"klar");
        assert_eq!(
            media.decryptor_stats(ParticipantId(1)).unwrap().passthrough,
            1
        );
    }

    #[test]
    fn paralleles_verschluesseln_aus_mehreren_threads() {
        let media = handle();
        media
            .encryptor
            .set_key_ratchet(HashRatchet::handle(SecretBytes::new(vec![3; 32])));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let m = media.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        m.encrypt(i, b"frame").unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(media.encryptor_stats().erfolg, 200);
    }
}
