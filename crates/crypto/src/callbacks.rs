//! Ausgehende Nachrichten an das Voice-Gateway
//!
//! Die Session meldet Key-Packages, Commit/Welcome-Bundles und
//! Transition-Quittungen ueber `GatewayCallbacks`. Fehler beim Senden
//! werden nur geloggt; der lokale Zustand bleibt massgeblich.

use tokio::sync::mpsc;

use voxmls_core::{OutboundMessage, TransitionId};

use crate::error::GatewayError;

/// Senke fuer ausgehende Protokoll-Nachrichten
pub trait GatewayCallbacks: Send + 'static {
    fn send_key_package(&self, key_package: Vec<u8>) -> Result<(), GatewayError>;

    fn send_commit_welcome(&self, commit_welcome: Vec<u8>) -> Result<(), GatewayError>;

    fn send_ready_for_transition(&self, transition_id: TransitionId) -> Result<(), GatewayError>;

    fn send_invalid_commit_welcome(&self, transition_id: TransitionId)
        -> Result<(), GatewayError>;
}

// ---------------------------------------------------------------------------
// ChannelCallbacks
// ---------------------------------------------------------------------------

/// Callbacks ueber eine tokio mpsc-Queue
///
/// Die Gateway-Verbindung liest aus dem Receiver und sendet die
/// `OutboundMessage`s ueber den Signaling-Kanal.
#[derive(Clone, Debug)]
pub struct ChannelCallbacks {
    tx: mpsc::Sender<OutboundMessage>,
}

impl ChannelCallbacks {
    /// Erstellt Callbacks samt Empfangs-Queue
    pub fn neu(queue_groesse: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(queue_groesse.max(1));
        (Self { tx }, rx)
    }

    /// Sendet eine Nachricht nicht-blockierend
    fn senden(&self, nachricht: OutboundMessage) -> Result<(), GatewayError> {
        let opcode = nachricht.opcode();
        match self.tx.try_send(nachricht) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(opcode = ?opcode, "Gateway-Queue voll – Nachricht verworfen");
                Err(GatewayError::QueueVoll)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(opcode = ?opcode, "Gateway-Queue geschlossen");
                Err(GatewayError::Geschlossen)
            }
        }
    }
}

impl GatewayCallbacks for ChannelCallbacks {
    fn send_key_package(&self, key_package: Vec<u8>) -> Result<(), GatewayError> {
        self.senden(OutboundMessage::KeyPackage { key_package })
    }

    fn send_commit_welcome(&self, commit_welcome: Vec<u8>) -> Result<(), GatewayError> {
        self.senden(OutboundMessage::CommitWelcome { commit_welcome })
    }

    fn send_ready_for_transition(&self, transition_id: TransitionId) -> Result<(), GatewayError> {
        self.senden(OutboundMessage::ReadyForTransition { transition_id })
    }

    fn send_invalid_commit_welcome(
        &self,
        transition_id: TransitionId,
    ) -> Result<(), GatewayError> {
        self.senden(OutboundMessage::InvalidCommitWelcome { transition_id })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
