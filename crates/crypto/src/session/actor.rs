//! Session-Actor
//!
//! Control-Plane-Events einer Session duerfen sich nicht ueberlappen. Der
//! Actor besitzt die Session exklusiv in einem tokio-Task und arbeitet die
//! Events aus seiner mpsc-Queue der Reihe nach ab. Der Media-Pfad laeuft
//! daneben ueber den geteilten `MediaPfad` und braucht den Task nicht.
//!
//! Wenn alle `SessionHandle`s gedroppt sind, endet der Task und die Session
//! (samt Encryptor und Decryptoren) wird freigegeben.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use voxmls_core::{ChannelId, InboundEvent, ParticipantId, ProtocolVersion, VoxError, VoxResult};

use crate::session::media::MediaPfad;
use crate::session::{SessionStatus, VoiceSession};

/// Nachrichten an den Session-Task
enum Befehl {
    Event(InboundEvent),
    KanalSetzen {
        channel_id: ChannelId,
        antwort: oneshot::Sender<VoxResult<()>>,
    },
    Status(oneshot::Sender<SessionStatus>),
}

/// Laufender Session-Task
pub struct SessionActor {
    task: tokio::task::JoinHandle<()>,
}

impl SessionActor {
    /// Startet den Task und gibt ein Handle auf die Event-Queue zurueck
    pub fn starten<S: VoiceSession>(mut session: S, queue_groesse: usize) -> (Self, SessionHandle) {
        let (tx, mut rx) = mpsc::channel::<Befehl>(queue_groesse.max(1));
        let self_id = session.self_id();
        let handle = SessionHandle {
            tx,
            media: session.media(),
            self_id,
            max_version: session.max_supported_protocol_version(),
        };

        let task = tokio::spawn(async move {
            while let Some(befehl) = rx.recv().await {
                match befehl {
                    Befehl::Event(event) => session.handle_event(event),
                    Befehl::KanalSetzen {
                        channel_id,
                        antwort,
                    } => {
                        let _ = antwort.send(session.set_channel_id(channel_id));
                    }
                    Befehl::Status(antwort) => {
                        let _ = antwort.send(session.status());
                    }
                }
            }
            tracing::debug!(teilnehmer = %self_id, "Session-Task beendet");
        });

        (Self { task }, handle)
    }

    /// Wartet bis der Task nach dem Drop aller Handles beendet ist
    pub async fn beendet(self) {
        if let Err(e) = self.task.await {
            tracing::error!(fehler = %e, "Session-Task abgebrochen");
        }
    }
}

/// Cloneable Handle auf einen laufenden Session-Task
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Befehl>,
    media: Arc<dyn MediaPfad>,
    self_id: ParticipantId,
    max_version: ProtocolVersion,
}

impl SessionHandle {
    /// Reiht ein Gateway-Event ein (wartet bei voller Queue)
    pub async fn senden(&self, event: InboundEvent) -> VoxResult<()> {
        self.tx
            .send(Befehl::Event(event))
            .await
            .map_err(|_| VoxError::SessionBeendet)
    }

    /// Setzt die Kanal-ID der Session
    pub async fn set_channel_id(&self, channel_id: ChannelId) -> VoxResult<()> {
        let (antwort, rx) = oneshot::channel();
        self.tx
            .send(Befehl::KanalSetzen {
                channel_id,
                antwort,
            })
            .await
            .map_err(|_| VoxError::SessionBeendet)?;
        rx.await.map_err(|_| VoxError::SessionBeendet)?
    }

    /// Zustand nach allen bisher eingereihten Events
    pub async fn status(&self) -> VoxResult<SessionStatus> {
        let (antwort, rx) = oneshot::channel();
        self.tx
            .send(Befehl::Status(antwort))
            .await
            .map_err(|_| VoxError::SessionBeendet)?;
        rx.await.map_err(|_| VoxError::SessionBeendet)
    }

    /// Media-Pfad fuer die Audio-Threads
    pub fn media(&self) -> Arc<dyn MediaPfad> {
        Arc::clone(&self.media)
    }

    pub fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    /// Beim Start ermittelte maximale Protokollversion
    pub fn max_supported_protocol_version(&self) -> ProtocolVersion {
        self.max_version
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("self_id", &self.self_id)
            .field("max_version", &self.max_version)
            .finish()
    }
}
