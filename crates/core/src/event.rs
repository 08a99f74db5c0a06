//! Gateway-Events der Kontroll-Ebene
//!
//! `InboundEvent` beschreibt alles, was die Signaling-Schicht (Voice-Gateway)
//! in eine Session hineinreicht; `OutboundMessage` alles, was eine Session
//! ueber ihre Callbacks zuruecksendet. Die Opcodes entsprechen denen des
//! Voice-Gateways. Der Transport (JSON/Binaer) liegt beim Einbetter; hier gibt
//! es nur eine JSON-Abbildung fuer Tests und Tools.

use serde::{Deserialize, Serialize};

use crate::error::{VoxError, VoxResult};
use crate::types::{Epoch, ParticipantId, ProtocolVersion, TransitionId};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

/// Opcodes des Voice-Gateways, soweit sie die Gruppen-Verschluesselung betreffen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GatewayOpcode {
    SelectProtocolAck = 4,
    ClientsConnect = 11,
    ClientDisconnect = 13,
    PrepareTransition = 21,
    ExecuteTransition = 22,
    ReadyForTransition = 23,
    PrepareEpoch = 24,
    MlsExternalSenderPackage = 25,
    MlsKeyPackage = 26,
    MlsProposals = 27,
    MlsCommitWelcome = 28,
    MlsAnnounceCommitTransition = 29,
    MlsWelcome = 30,
    MlsInvalidCommitWelcome = 31,
}

impl GatewayOpcode {
    /// Numerischer Wert auf dem Draht
    pub fn wert(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for GatewayOpcode {
    type Error = VoxError;

    fn try_from(value: u8) -> VoxResult<Self> {
        let op = match value {
            4 => Self::SelectProtocolAck,
            11 => Self::ClientsConnect,
            13 => Self::ClientDisconnect,
            21 => Self::PrepareTransition,
            22 => Self::ExecuteTransition,
            23 => Self::ReadyForTransition,
            24 => Self::PrepareEpoch,
            25 => Self::MlsExternalSenderPackage,
            26 => Self::MlsKeyPackage,
            27 => Self::MlsProposals,
            28 => Self::MlsCommitWelcome,
            29 => Self::MlsAnnounceCommitTransition,
            30 => Self::MlsWelcome,
            31 => Self::MlsInvalidCommitWelcome,
            other => return Err(VoxError::UnbekannterOpcode(other)),
        };
        Ok(op)
    }
}

// ---------------------------------------------------------------------------
// Eingehende Events
// ---------------------------------------------------------------------------

/// Ein vom Gateway zugestelltes Ereignis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Ausgehandelte Protokollversion (Bootstrap der Session)
    SelectProtocolAck { protocol_version: ProtocolVersion },
    /// Neue Teilnehmer im Kanal
    ClientsConnect { user_ids: Vec<ParticipantId> },
    /// Teilnehmer hat den Kanal verlassen
    ClientDisconnect { user_id: ParticipantId },
    /// Versionswechsel vorbereiten (Empfaenger scharf schalten)
    PrepareTransition {
        transition_id: TransitionId,
        protocol_version: ProtocolVersion,
    },
    /// Versionswechsel ausfuehren (Sender umschalten)
    ExecuteTransition { transition_id: TransitionId },
    /// Neue Epoch vorbereiten
    PrepareEpoch {
        epoch: Epoch,
        protocol_version: ProtocolVersion,
    },
    /// Vertrauenswuerdiger externer Sender der Gruppe
    ExternalSenderPackage { package: Vec<u8> },
    /// MLS-Proposals
    Proposals { proposals: Vec<u8> },
    /// Angekuendigter Commit samt Transition
    PrepareCommitTransition {
        transition_id: TransitionId,
        commit: Vec<u8>,
    },
    /// Welcome fuer den eigenen Beitritt
    Welcome {
        transition_id: TransitionId,
        welcome: Vec<u8>,
    },
}

impl InboundEvent {
    /// Opcode unter dem das Event auf dem Gateway ankommt
    pub fn opcode(&self) -> GatewayOpcode {
        match self {
            Self::SelectProtocolAck { .. } => GatewayOpcode::SelectProtocolAck,
            Self::ClientsConnect { .. } => GatewayOpcode::ClientsConnect,
            Self::ClientDisconnect { .. } => GatewayOpcode::ClientDisconnect,
            Self::PrepareTransition { .. } => GatewayOpcode::PrepareTransition,
            Self::ExecuteTransition { .. } => GatewayOpcode::ExecuteTransition,
            Self::PrepareEpoch { .. } => GatewayOpcode::PrepareEpoch,
            Self::ExternalSenderPackage { .. } => GatewayOpcode::MlsExternalSenderPackage,
            Self::Proposals { .. } => GatewayOpcode::MlsProposals,
            Self::PrepareCommitTransition { .. } => GatewayOpcode::MlsAnnounceCommitTransition,
            Self::Welcome { .. } => GatewayOpcode::MlsWelcome,
        }
    }

    /// Parst ein Event aus seiner JSON-Darstellung
    pub fn from_json(json: &str) -> VoxResult<Self> {
        serde_json::from_str(json).map_err(|e| VoxError::UngueltigeNachricht(e.to_string()))
    }

    /// Serialisiert das Event nach JSON
    pub fn to_json(&self) -> VoxResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten
// ---------------------------------------------------------------------------

/// Von der Session an das Gateway gesendete Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OutboundMessage {
    KeyPackage { key_package: Vec<u8> },
    CommitWelcome { commit_welcome: Vec<u8> },
    ReadyForTransition { transition_id: TransitionId },
    InvalidCommitWelcome { transition_id: TransitionId },
}

impl OutboundMessage {
    /// Opcode unter dem die Nachricht gesendet wird
    pub fn opcode(&self) -> GatewayOpcode {
        match self {
            Self::KeyPackage { .. } => GatewayOpcode::MlsKeyPackage,
            Self::CommitWelcome { .. } => GatewayOpcode::MlsCommitWelcome,
            Self::ReadyForTransition { .. } => GatewayOpcode::ReadyForTransition,
            Self::InvalidCommitWelcome { .. } => GatewayOpcode::MlsInvalidCommitWelcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_zuordnung() {
        let ev = InboundEvent::PrepareCommitTransition {
            transition_id: TransitionId(5),
            commit: vec![1, 2, 3],
        };
        assert_eq!(ev.opcode(), GatewayOpcode::MlsAnnounceCommitTransition);
        assert_eq!(ev.opcode().wert(), 29);

        let out = OutboundMessage::ReadyForTransition {
            transition_id: TransitionId(5),
        };
        assert_eq!(out.opcode().wert(), 23);
    }

    #[test]
    fn opcode_aus_byte() {
        assert_eq!(
            GatewayOpcode::try_from(30).unwrap(),
            GatewayOpcode::MlsWelcome
        );
        assert!(matches!(
            GatewayOpcode::try_from(99),
            Err(VoxError::UnbekannterOpcode(99))
        ));
    }

    #[test]
    fn event_aus_json() {
        let json = r#"{"op":"prepare_transition","transition_id":7,"protocol_version":1}"#;
        let ev = InboundEvent::from_json(json).unwrap();
        assert_eq!(
            ev,
            InboundEvent::PrepareTransition {
                transition_id: TransitionId(7),
                protocol_version: ProtocolVersion(1),
            }
        );
        assert_eq!(InboundEvent::from_json(&ev.to_json().unwrap()).unwrap(), ev);
    }

    #[test]
    fn kaputtes_json_ist_protokollfehler() {
        let err = InboundEvent::from_json(r#"{"op":"gibt_es_nicht"}"#).unwrap_err();
        assert!(err.ist_protokollfehler());
    }
}
