//! Sessions pro Voice-Verbindung
//!
//! - `group` - `GroupSession`, der Transition-Koordinator (MLS aktiv)
//! - `passthrough` - `PassthroughSession` ohne Gruppenverschluesselung
//! - `media` - `MediaHandle` fuer die Audio-Threads
//! - `actor` - `SessionActor`, serialisiert Events ueber eine tokio-Queue

pub mod actor;
pub mod group;
pub mod media;
pub mod passthrough;

use std::sync::Arc;
use tokio::sync::mpsc;

use voxmls_core::{
    ChannelId, InboundEvent, OutboundMessage, ParticipantId, ProtocolVersion, VoxResult,
};

use crate::callbacks::{ChannelCallbacks, GatewayCallbacks};
use crate::config::SessionConfig;
use crate::engine::GroupEngine;

pub use actor::{SessionActor, SessionHandle};
pub use group::{BootstrapModus, GroupSession, SessionState};
pub use media::{MediaHandle, MediaPfad};
pub use passthrough::PassthroughSession;

/// Kurzer Zustandsbericht einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub protocol_version: ProtocolVersion,
    /// Anzahl bekannter Remote-Teilnehmer
    pub teilnehmer: usize,
    /// Vorgemerkte, noch nicht ausgefuehrte Transitions
    pub offene_transitions: usize,
}

/// Gemeinsame Sicht auf Group- und Passthrough-Sessions
pub trait VoiceSession: Send + 'static {
    fn self_id(&self) -> ParticipantId;

    /// Hoechste Version die dem Gateway angeboten wird (0 = keine)
    fn max_supported_protocol_version(&self) -> ProtocolVersion;

    fn set_channel_id(&mut self, channel_id: ChannelId) -> VoxResult<()>;

    /// Wendet ein Gateway-Event an
    fn handle_event(&mut self, event: InboundEvent);

    /// Media-Pfad fuer die Audio-Threads
    fn media(&self) -> Arc<dyn MediaPfad>;

    fn status(&self) -> SessionStatus;
}

impl<S: VoiceSession + ?Sized> VoiceSession for Box<S> {
    fn self_id(&self) -> ParticipantId {
        (**self).self_id()
    }

    fn max_supported_protocol_version(&self) -> ProtocolVersion {
        (**self).max_supported_protocol_version()
    }

    fn set_channel_id(&mut self, channel_id: ChannelId) -> VoxResult<()> {
        (**self).set_channel_id(channel_id)
    }

    fn handle_event(&mut self, event: InboundEvent) {
        (**self).handle_event(event)
    }

    fn media(&self) -> Arc<dyn MediaPfad> {
        (**self).media()
    }

    fn status(&self) -> SessionStatus {
        (**self).status()
    }
}

/// Erstellt die passende Session fuer eine Voice-Verbindung
///
/// Bei `protokoll.aktiviert = false` entsteht eine `PassthroughSession`;
/// Engine und Callbacks werden dann nicht benoetigt und verworfen.
pub fn create_session<G, C>(
    config: &SessionConfig,
    self_id: ParticipantId,
    engine: G,
    callbacks: C,
) -> Box<dyn VoiceSession>
where
    G: GroupEngine,
    C: GatewayCallbacks,
{
    if !config.protokoll.aktiviert {
        return Box::new(PassthroughSession::new(self_id));
    }

    let session = GroupSession::new(self_id, engine, callbacks, config.cryptor_factory())
        .mit_max_version(config.max_version());
    Box::new(session)
}

/// Erstellt eine Session und startet sie in einem `SessionActor`
///
/// Ausgehende Nachrichten landen in der zurueckgegebenen Queue. Event- und
/// Ausgangs-Queue haben die Kapazitaet aus `[actor] queue_groesse`.
pub fn session_starten<G: GroupEngine>(
    config: &SessionConfig,
    self_id: ParticipantId,
    engine: G,
) -> (SessionActor, SessionHandle, mpsc::Receiver<OutboundMessage>) {
    let queue_groesse = config.actor.queue_groesse;
    let (callbacks, ausgang) = ChannelCallbacks::neu(queue_groesse);
    let session = create_session(config, self_id, engine, callbacks);
    let (actor, handle) = SessionActor::starten(session, queue_groesse);
    (actor, handle, ausgang)
}
