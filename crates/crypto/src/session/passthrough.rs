//! Session ohne Gruppenverschluesselung
//!
//! Bietet dem Gateway Protokollversion 0 an, reicht alle Frames unveraendert
//! durch und ignoriert Protokoll-Events.

use std::sync::Arc;

use voxmls_core::{
    ChannelId, Codec, InboundEvent, ParticipantId, ProtocolVersion, VoxResult,
    DISABLED_PROTOCOL_VERSION,
};

use crate::error::CryptoResult;
use crate::session::media::MediaPfad;
use crate::session::{SessionState, SessionStatus, VoiceSession};

/// Passthrough-Session (Verschluesselung abgeschaltet)
#[derive(Debug)]
pub struct PassthroughSession {
    self_id: ParticipantId,
    channel_id: Option<ChannelId>,
}

impl PassthroughSession {
    pub fn new(self_id: ParticipantId) -> Self {
        tracing::warn!(
            teilnehmer = %self_id,
            "E2E-Verschluesselung deaktiviert – Frames werden unverschluesselt uebertragen"
        );
        Self {
            self_id,
            channel_id: None,
        }
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id
    }
}

/// Media-Pfad der Frames unveraendert zurueckgibt
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMedia;

impl MediaPfad for PassthroughMedia {
    fn encrypt(&self, _ssrc: u32, frame: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(frame.to_vec())
    }

    fn decrypt(&self, _sender: ParticipantId, frame: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(frame.to_vec())
    }

    fn assign_ssrc_to_codec(&self, _ssrc: u32, _codec: Codec) {}
}

impl VoiceSession for PassthroughSession {
    fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    fn max_supported_protocol_version(&self) -> ProtocolVersion {
        DISABLED_PROTOCOL_VERSION
    }

    fn set_channel_id(&mut self, channel_id: ChannelId) -> VoxResult<()> {
        self.channel_id = Some(channel_id);
        Ok(())
    }

    fn handle_event(&mut self, event: InboundEvent) {
        tracing::trace!(opcode = ?event.opcode(), "Passthrough-Session – Event ignoriert");
    }

    fn media(&self) -> Arc<dyn MediaPfad> {
        Arc::new(PassthroughMedia)
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: SessionState::Bereit,
            protocol_version: DISABLED_PROTOCOL_VERSION,
            teilnehmer: 0,
            offene_transitions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmls_core::TransitionId;

    #[test]
    fn bietet_version_null_an() {
        let s = PassthroughSession::new(ParticipantId(1));
        assert_eq!(s.max_supported_protocol_version(), ProtocolVersion(0));
    }

    #[test]
    fn frames_bleiben_unveraendert() {
        let s = PassthroughSession::new(ParticipantId(1));
        let media = s.media();
        assert_eq!(media.encrypt(7, b"opus").unwrap(), b"opus");
        assert_eq!(media.decrypt(ParticipantId(2), b"opus").unwrap(), b"opus");
    }

    #[test]
    fn events_aendern_nichts() {
        let mut s = PassthroughSession::new(ParticipantId(1));
        s.handle_event(InboundEvent::ClientsConnect {
            user_ids: vec![ParticipantId(2)],
        });
        s.handle_event(InboundEvent::PrepareTransition {
            transition_id: TransitionId(3),
            protocol_version: ProtocolVersion(1),
        });
        let status = s.status();
        assert_eq!(status.teilnehmer, 0);
        assert_eq!(status.offene_transitions, 0);
        assert_eq!(status.protocol_version, ProtocolVersion(0));
    }
}
