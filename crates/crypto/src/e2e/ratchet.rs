//! Key-Ratchet pro Teilnehmer
//!
//! Die Group-Engine liefert pro Teilnehmer einen `KeyRatchet`, aus dem die
//! Frame-Schluessel einer Generation abgeleitet werden. Die Generation steht
//! im obersten Byte des Nonce-Zaehlers eines Frames.
//!
//! `HashRatchet` ist die Referenz-Implementierung: Schluessel einer
//! Generation = HKDF-SHA256(Basis-Secret, Generation). Geloeschte
//! Generationen lassen sich nicht erneut ableiten.

use hkdf::Hkdf;
use parking_lot::Mutex;
use sha2::Sha256;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Laenge eines Frame-Schluessels in Bytes
pub const FRAME_KEY_LEN: usize = 32;

const RATCHET_SALT: &[u8] = b"voxmls-ratchet-v1";

/// Quelle fuer Frame-Schluessel eines Teilnehmers
pub trait KeyRatchet: Send + Sync + std::fmt::Debug {
    /// Liefert den Schluessel fuer eine Generation
    fn key(&self, generation: u8) -> CryptoResult<SecretBytes>;

    /// Vergisst den Schluessel einer Generation endgueltig
    fn delete_key(&self, generation: u8);
}

/// Geteilter Handle auf einen Key-Ratchet (Engine -> Kryptor)
pub type KeyRatchetHandle = Arc<dyn KeyRatchet>;

/// Referenz-Ratchet mit HKDF-Ableitung pro Generation
pub struct HashRatchet {
    basis: SecretBytes,
    cache: Mutex<RatchetCache>,
}

#[derive(Default)]
struct RatchetCache {
    schluessel: HashMap<u8, SecretBytes>,
    geloescht: HashSet<u8>,
}

impl HashRatchet {
    /// Erstellt einen Ratchet aus einem Basis-Secret (z.B. MLS-Exporter-Output)
    pub fn new(basis: SecretBytes) -> Self {
        Self {
            basis,
            cache: Mutex::new(RatchetCache::default()),
        }
    }

    /// Bequemer Konstruktor direkt als Handle
    pub fn handle(basis: SecretBytes) -> KeyRatchetHandle {
        Arc::new(Self::new(basis))
    }
}

impl std::fmt::Debug for HashRatchet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("HashRatchet")
            .field("gecacht", &cache.schluessel.len())
            .field("geloescht", &cache.geloescht.len())
            .finish()
    }
}

impl KeyRatchet for HashRatchet {
    fn key(&self, generation: u8) -> CryptoResult<SecretBytes> {
        let mut cache = self.cache.lock();
        if cache.geloescht.contains(&generation) {
            return Err(CryptoError::FehlenderSchluessel { generation });
        }
        if let Some(key) = cache.schluessel.get(&generation) {
            return Ok(key.clone());
        }

        let key = SecretBytes::new(hkdf_derive(
            self.basis.as_bytes(),
            RATCHET_SALT,
            &[generation],
            FRAME_KEY_LEN,
        )?);
        cache.schluessel.insert(generation, key.clone());
        Ok(key)
    }

    fn delete_key(&self, generation: u8) {
        let mut cache = self.cache.lock();
        cache.schluessel.remove(&generation);
        cache.geloescht.insert(generation);
    }
}

/// HKDF-SHA256 Key-Ableitung
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
