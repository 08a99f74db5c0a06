//! Frame-Kryptor (End-to-End)
//!
//! Der Server forwardet Audio-Frames blind. Jeder Client verschluesselt
//! seine eigenen Frames mit dem Key-Ratchet, den die MLS-Gruppe fuer ihn
//! ableitet, und entschluesselt die Frames der anderen mit deren Ratchets.
//!
//! ## Ablauf
//! 1. Group-Engine liefert nach Commit/Welcome einen Ratchet pro Teilnehmer
//! 2. Session setzt ihn im Encryptor (eigener) bzw. Decryptor (remote)
//! 3. Frames tragen `[ciphertext][nonce][0xFA 0xFA]`
//! 4. Beim Wechsel bleibt der alte Ratchet kurz gueltig (Uebergangsfenster)

pub mod cryptor;
pub mod decrypt;
pub mod encrypt;
pub mod frame;
pub mod ratchet;

pub use cryptor::{
    CryptorFactory, FrameDecryptor, FrameEncryptor, MediaCryptorFactory,
    DEFAULT_TRANSITION_EXPIRY,
};
pub use decrypt::MediaDecryptor;
pub use encrypt::MediaEncryptor;
pub use frame::{generation_of, ist_verschluesselt, FRAME_OVERHEAD, MAGIC_MARKER};
pub use ratchet::{hkdf_derive, HashRatchet, KeyRatchet, KeyRatchetHandle, FRAME_KEY_LEN};
