//! # voxmls-crypto
//!
//! Session-Koordinator fuer MLS-basierte Ende-zu-Ende-Verschluesselung von
//! Voice-Gruppen.
//!
//! ## Module
//! - `session` - `GroupSession` (Transition-Koordinator), Passthrough, Actor
//! - `engine` - Schnittstelle zur MLS-Group-Engine
//! - `callbacks` - Ausgehende Nachrichten an das Voice-Gateway
//! - `e2e` - Frame-Kryptor (Encryptor/Decryptor, Key-Ratchet)
//! - `config` - Session-Konfiguration (TOML)
//! - `types` - Gemeinsame Typen (SecretBytes, FrameCipher, CryptorStats)
//! - `error` - Fehlertypen

pub mod callbacks;
pub mod config;
pub mod e2e;
pub mod engine;
pub mod error;
pub mod session;
pub mod types;

#[cfg(test)]
mod tests;

// Bequeme Re-Exports
pub use callbacks::{ChannelCallbacks, GatewayCallbacks};
pub use config::SessionConfig;
pub use engine::{CommitOutcome, GroupEngine, Roster};
pub use error::{CryptoError, CryptoResult, GatewayError};
pub use types::{CryptorStats, FrameCipher, SecretBytes};

pub use e2e::{
    CryptorFactory, FrameDecryptor, FrameEncryptor, HashRatchet, KeyRatchet, KeyRatchetHandle,
    MediaCryptorFactory, MediaDecryptor, MediaEncryptor,
};

pub use session::{
    create_session, session_starten, BootstrapModus, GroupSession, MediaHandle, MediaPfad,
    PassthroughSession, SessionActor, SessionHandle, SessionState, SessionStatus, VoiceSession,
};
