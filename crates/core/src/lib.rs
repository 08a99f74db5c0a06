//! voxmls-core – Gemeinsame Typen, Gateway-Events und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die vom
//! Krypto-Crate und von Einbettern (Voice-Gateway-Clients) gemeinsam
//! genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{VoxError, VoxResult};
pub use event::{GatewayOpcode, InboundEvent, OutboundMessage};
pub use types::{
    ChannelId, Codec, Epoch, ParticipantId, ProtocolVersion, TransitionId,
    DISABLED_PROTOCOL_VERSION, INIT_TRANSITION_ID, NEW_GROUP_EPOCH,
};
