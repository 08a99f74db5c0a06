//! Frame-Format des Referenz-Kryptors
//!
//! ## Format
//! ```text
//! [ciphertext + auth_tag(16)] [nonce(4)] [magic(2) = 0xFA 0xFA]
//! ```
//!
//! ## Nonce
//! 32-Bit Zaehler (Big Endian). Das oberste Byte ist die Ratchet-Generation.
//! Fuer die AEAD wird er auf 12 Bytes erweitert: `[0u8; 8] ++ zaehler`.
//!
//! ## AAD
//! Das Magic-Marker-Suffix, damit ein abgeschnittener Frame nicht als
//! gueltig durchgeht.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use chacha20poly1305::{ChaCha20Poly1305, Key as ChaChaKey, Nonce as ChaChaNonce};

use crate::e2e::ratchet::FRAME_KEY_LEN;
use crate::error::{CryptoError, CryptoResult};
use crate::types::FrameCipher;

/// Markiert das Ende eines verschluesselten Frames
pub const MAGIC_MARKER: [u8; 2] = [0xFA, 0xFA];

/// Laenge des uebertragenen Nonce-Zaehlers
pub const NONCE_LEN: usize = 4;

/// Laenge des AEAD-Auth-Tags
pub const TAG_LEN: usize = 16;

/// Groessenzuwachs eines Frames durch die Verschluesselung
pub const FRAME_OVERHEAD: usize = TAG_LEN + NONCE_LEN + MAGIC_MARKER.len();

/// Ratchet-Generation eines Nonce-Zaehlers
pub fn generation_of(counter: u32) -> u8 {
    (counter >> 24) as u8
}

/// true wenn der Frame das Suffix eines verschluesselten Frames traegt
pub fn ist_verschluesselt(frame: &[u8]) -> bool {
    frame.len() >= FRAME_OVERHEAD && frame.ends_with(&MAGIC_MARKER)
}

/// Zerlegter verschluesselter Frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParsedFrame<'a> {
    pub ciphertext: &'a [u8],
    pub counter: u32,
}

impl ParsedFrame<'_> {
    pub fn generation(&self) -> u8 {
        generation_of(self.counter)
    }
}

/// Zerlegt einen verschluesselten Frame in Ciphertext und Nonce-Zaehler
pub(crate) fn parse(frame: &[u8]) -> CryptoResult<ParsedFrame<'_>> {
    if !ist_verschluesselt(frame) {
        return Err(CryptoError::UngueltigeDaten(
            "Frame ohne Magic-Marker oder zu kurz".to_string(),
        ));
    }

    let nonce_start = frame.len() - MAGIC_MARKER.len() - NONCE_LEN;
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&frame[nonce_start..nonce_start + NONCE_LEN]);

    Ok(ParsedFrame {
        ciphertext: &frame[..nonce_start],
        counter: u32::from_be_bytes(nonce),
    })
}

/// Verschluesselt einen Klartext-Frame und haengt Nonce + Marker an
pub(crate) fn seal(
    cipher: FrameCipher,
    key: &[u8],
    counter: u32,
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    check_key_len(key)?;
    let nonce = full_nonce(counter);
    let payload = Payload {
        msg: plaintext,
        aad: &MAGIC_MARKER,
    };

    let mut out = match cipher {
        FrameCipher::Aes256Gcm => Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
            .encrypt(AesNonce::from_slice(&nonce), payload),
        FrameCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new(ChaChaKey::from_slice(key))
            .encrypt(ChaChaNonce::from_slice(&nonce), payload),
    }
    .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    out.reserve(NONCE_LEN + MAGIC_MARKER.len());
    out.extend_from_slice(&counter.to_be_bytes());
    out.extend_from_slice(&MAGIC_MARKER);
    Ok(out)
}

/// Entschluesselt einen zerlegten Frame
pub(crate) fn open(
    cipher: FrameCipher,
    key: &[u8],
    frame: &ParsedFrame<'_>,
) -> CryptoResult<Vec<u8>> {
    check_key_len(key)?;
    let nonce = full_nonce(frame.counter);
    let payload = Payload {
        msg: frame.ciphertext,
        aad: &MAGIC_MARKER,
    };

    match cipher {
        FrameCipher::Aes256Gcm => Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
            .decrypt(AesNonce::from_slice(&nonce), payload),
        FrameCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new(ChaChaKey::from_slice(key))
            .decrypt(ChaChaNonce::from_slice(&nonce), payload),
    }
    .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
}

fn full_nonce(counter: u32) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[8..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

fn check_key_len(key: &[u8]) -> CryptoResult<()> {
    if key.len() != FRAME_KEY_LEN {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: FRAME_KEY_LEN,
            erhalten: key.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [9u8; 32];

    #[test]
    fn frame_traegt_nonce_und_marker() {
        let frame = seal(FrameCipher::Aes256Gcm, &KEY, 0x0100_0007, b"opus").unwrap();
        assert_eq!(frame.len(), 4 + FRAME_OVERHEAD);
        assert!(ist_verschluesselt(&frame));

        let parsed = parse(&frame).unwrap();
        assert_eq!(parsed.counter, 0x0100_0007);
        assert_eq!(parsed.generation(), 1);
    }

    #[test]
    fn chacha_frame_entschluesseln() {
        let frame = seal(FrameCipher::ChaCha20Poly1305, &KEY, 3, b"Opus-Frame").unwrap();
        let parsed = parse(&frame).unwrap();
        let klartext = open(FrameCipher::ChaCha20Poly1305, &KEY, &parsed).unwrap();
        assert_eq!(klartext, b"Opus-Frame");
    }

    #[test]
    fn falscher_algorithmus_schlaegt_fehl() {
        let frame = seal(FrameCipher::Aes256Gcm, &KEY, 3, b"audio").unwrap();
        let parsed = parse(&frame).unwrap();
        assert!(open(FrameCipher::ChaCha20Poly1305, &KEY, &parsed).is_err());
    }

    #[test]
    fn manipulierter_nonce_schlaegt_fehl() {
        let mut frame = seal(FrameCipher::Aes256Gcm, &KEY, 3, b"audio").unwrap();
        let idx = frame.len() - MAGIC_MARKER.len() - 1;
        frame[idx] ^= 0x01;
        let parsed = parse(&frame).unwrap();
        assert!(matches!(
            open(FrameCipher::Aes256Gcm, &KEY, &parsed),
            Err(CryptoError::Entschluesselung(_))
        ));
    }

    #[test]
    fn klartext_ohne_marker_ist_nicht_verschluesselt() {
        assert!(!ist_verschluesselt(b"kurz"));
        assert!(!ist_verschluesselt(&[0u8; 64]));
        assert!(parse(&[0u8; 64]).is_err());
    }

    #[test]
    fn falsche_schluessel_laenge() {
        let result = seal(FrameCipher::Aes256Gcm, &[0u8; 16], 0, b"x");
        assert!(matches!(
            result,
            Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: 32,
                erhalten: 16
            })
        ));
    }
}
