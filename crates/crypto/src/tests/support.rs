//! Test-Hilfen: geskriptete Group-Engine und aufzeichnende Callbacks

use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use voxmls_core::{ChannelId, OutboundMessage, ParticipantId, ProtocolVersion, TransitionId};

use crate::callbacks::GatewayCallbacks;
use crate::e2e::{
    FrameDecryptor, FrameEncryptor, HashRatchet, KeyRatchetHandle, MediaCryptorFactory,
    MediaDecryptor, MediaEncryptor, DEFAULT_TRANSITION_EXPIRY,
};
use crate::engine::{CommitOutcome, GroupEngine, Roster};
use crate::error::GatewayError;
use crate::session::GroupSession;
use crate::types::{FrameCipher, SecretBytes};

pub const SELBST: ParticipantId = ParticipantId(1000);

pub type TestSession = GroupSession<ScriptedEngine, RecordingCallbacks, MediaCryptorFactory>;

/// Ratchet den die geskriptete Engine fuer `(version, teilnehmer)` liefert
pub fn ratchet_fuer(version: ProtocolVersion, teilnehmer: ParticipantId) -> KeyRatchetHandle {
    HashRatchet::handle(SecretBytes::new(
        format!("v{}:{}", version.0, teilnehmer).into_bytes(),
    ))
}

/// Frame den `teilnehmer` unter `version` senden wuerde
pub fn frame_von(version: ProtocolVersion, teilnehmer: ParticipantId, klartext: &[u8]) -> Vec<u8> {
    let enc = MediaEncryptor::new(FrameCipher::Aes256Gcm);
    enc.set_key_ratchet(ratchet_fuer(version, teilnehmer));
    enc.encrypt(1, klartext).unwrap()
}

/// Entschluesselt einen eigenen Frame so wie ein Empfaenger unter `version`
pub fn als_empfaenger_lesen(version: ProtocolVersion, frame: &[u8]) -> Option<Vec<u8>> {
    let dec = MediaDecryptor::new(FrameCipher::Aes256Gcm, DEFAULT_TRANSITION_EXPIRY);
    dec.transition_to_key_ratchet(ratchet_fuer(version, SELBST));
    dec.decrypt(frame).ok()
}

pub fn neue_session() -> (TestSession, ScriptedEngine, RecordingCallbacks) {
    let engine = ScriptedEngine::default();
    let callbacks = RecordingCallbacks::default();
    let mut session = GroupSession::new(
        SELBST,
        engine.clone(),
        callbacks.clone(),
        MediaCryptorFactory::default(),
    );
    session.set_channel_id(ChannelId(77)).unwrap();
    (session, engine, callbacks)
}

// ---------------------------------------------------------------------------
// ScriptedEngine
// ---------------------------------------------------------------------------

/// Von der Engine beobachteter Aufruf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAufruf {
    Init {
        version: ProtocolVersion,
        channel_id: ChannelId,
        self_id: ParticipantId,
    },
    Reset,
    ExternalSender(Vec<u8>),
    Proposals(BTreeSet<String>),
    Commit(Vec<u8>),
    Welcome(BTreeSet<String>),
    KeyPackage,
}

#[derive(Default)]
struct EngineZustand {
    version: ProtocolVersion,
    max_version: ProtocolVersion,
    aufrufe: Vec<EngineAufruf>,
    commits: VecDeque<(CommitOutcome, ProtocolVersion)>,
    welcomes: VecDeque<Option<(Roster, ProtocolVersion)>>,
    proposals: VecDeque<Option<Vec<u8>>>,
    ohne_ratchet: BTreeSet<String>,
}

/// Group-Engine mit vorgegebenen Antworten; Klone teilen den Zustand
#[derive(Clone)]
pub struct ScriptedEngine {
    zustand: Arc<Mutex<EngineZustand>>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            zustand: Arc::new(Mutex::new(EngineZustand {
                max_version: ProtocolVersion(1),
                ..Default::default()
            })),
        }
    }
}

impl ScriptedEngine {
    /// Naechster Commit liefert `outcome`; bei Erfolg gilt danach `version`
    pub fn commit_antwort(&self, outcome: CommitOutcome, version: ProtocolVersion) {
        self.zustand.lock().commits.push_back((outcome, version));
    }

    /// Naechstes Welcome wird angenommen (Some) oder abgelehnt (None)
    pub fn welcome_antwort(&self, antwort: Option<(Roster, ProtocolVersion)>) {
        self.zustand.lock().welcomes.push_back(antwort);
    }

    pub fn proposals_antwort(&self, antwort: Option<Vec<u8>>) {
        self.zustand.lock().proposals.push_back(antwort);
    }

    /// Fuer diesen Teilnehmer liefert die Engine keinen Ratchet
    pub fn ohne_ratchet(&self, teilnehmer: ParticipantId) {
        self.zustand.lock().ohne_ratchet.insert(teilnehmer.to_string());
    }

    pub fn version_setzen(&self, version: ProtocolVersion) {
        self.zustand.lock().version = version;
    }

    pub fn max_version_setzen(&self, version: ProtocolVersion) {
        self.zustand.lock().max_version = version;
    }

    pub fn aufrufe(&self) -> Vec<EngineAufruf> {
        self.zustand.lock().aufrufe.clone()
    }

    pub fn aufrufe_leeren(&self) {
        self.zustand.lock().aufrufe.clear();
    }

    fn aufzeichnen(&self, aufruf: EngineAufruf) {
        self.zustand.lock().aufrufe.push(aufruf);
    }
}

impl GroupEngine for ScriptedEngine {
    fn init(&mut self, version: ProtocolVersion, channel_id: ChannelId, self_id: ParticipantId) {
        self.zustand.lock().version = version;
        self.aufzeichnen(EngineAufruf::Init {
            version,
            channel_id,
            self_id,
        });
    }

    fn reset(&mut self) {
        self.zustand.lock().version = ProtocolVersion(0);
        self.aufzeichnen(EngineAufruf::Reset);
    }

    fn protocol_version(&self) -> ProtocolVersion {
        self.zustand.lock().version
    }

    fn max_supported_protocol_version(&self) -> ProtocolVersion {
        self.zustand.lock().max_version
    }

    fn set_external_sender(&mut self, package: &[u8]) {
        self.aufzeichnen(EngineAufruf::ExternalSender(package.to_vec()));
    }

    fn process_proposals(
        &mut self,
        _proposals: &[u8],
        recognized: &BTreeSet<String>,
    ) -> Option<Vec<u8>> {
        self.aufzeichnen(EngineAufruf::Proposals(recognized.clone()));
        self.zustand.lock().proposals.pop_front().flatten()
    }

    fn process_commit(&mut self, commit: &[u8]) -> CommitOutcome {
        self.aufzeichnen(EngineAufruf::Commit(commit.to_vec()));
        let mut zustand = self.zustand.lock();
        match zustand.commits.pop_front() {
            Some((outcome, version)) => {
                if outcome.ist_erfolg() {
                    zustand.version = version;
                }
                outcome
            }
            None => CommitOutcome::Ignored,
        }
    }

    fn process_welcome(
        &mut self,
        _welcome: &[u8],
        recognized: &BTreeSet<String>,
    ) -> Option<Roster> {
        self.aufzeichnen(EngineAufruf::Welcome(recognized.clone()));
        let mut zustand = self.zustand.lock();
        let (roster, version) = zustand.welcomes.pop_front().flatten()?;
        zustand.version = version;
        Some(roster)
    }

    fn key_package(&mut self) -> Vec<u8> {
        self.aufzeichnen(EngineAufruf::KeyPackage);
        b"key-package".to_vec()
    }

    fn key_ratchet_for(&self, user_id: &str) -> Option<KeyRatchetHandle> {
        let zustand = self.zustand.lock();
        if zustand.ohne_ratchet.contains(user_id) {
            return None;
        }
        let basis = format!("v{}:{}", zustand.version.0, user_id);
        Some(HashRatchet::handle(SecretBytes::new(basis.into_bytes())))
    }

    fn last_epoch_authenticator(&self) -> Vec<u8> {
        vec![self.zustand.lock().version.0 as u8; 4]
    }
}

// ---------------------------------------------------------------------------
// RecordingCallbacks
// ---------------------------------------------------------------------------

/// Zeichnet alle ausgehenden Nachrichten auf; kann Sendefehler simulieren
#[derive(Clone, Default)]
pub struct RecordingCallbacks {
    gesendet: Arc<Mutex<Vec<OutboundMessage>>>,
    fehlschlagen: Arc<Mutex<bool>>,
}

impl RecordingCallbacks {
    pub fn gesendet(&self) -> Vec<OutboundMessage> {
        self.gesendet.lock().clone()
    }

    pub fn leeren(&self) {
        self.gesendet.lock().clear();
    }

    pub fn fehler_simulieren(&self, an: bool) {
        *self.fehlschlagen.lock() = an;
    }

    pub fn anzahl_key_packages(&self) -> usize {
        self.gesendet
            .lock()
            .iter()
            .filter(|m| matches!(m, OutboundMessage::KeyPackage { .. }))
            .count()
    }

    fn aufzeichnen(&self, nachricht: OutboundMessage) -> Result<(), GatewayError> {
        self.gesendet.lock().push(nachricht);
        if *self.fehlschlagen.lock() {
            return Err(GatewayError::Senden("simuliert".into()));
        }
        Ok(())
    }
}

impl GatewayCallbacks for RecordingCallbacks {
    fn send_key_package(&self, key_package: Vec<u8>) -> Result<(), GatewayError> {
        self.aufzeichnen(OutboundMessage::KeyPackage { key_package })
    }

    fn send_commit_welcome(&self, commit_welcome: Vec<u8>) -> Result<(), GatewayError> {
        self.aufzeichnen(OutboundMessage::CommitWelcome { commit_welcome })
    }

    fn send_ready_for_transition(&self, transition_id: TransitionId) -> Result<(), GatewayError> {
        self.aufzeichnen(OutboundMessage::ReadyForTransition { transition_id })
    }

    fn send_invalid_commit_welcome(
        &self,
        transition_id: TransitionId,
    ) -> Result<(), GatewayError> {
        self.aufzeichnen(OutboundMessage::InvalidCommitWelcome { transition_id })
    }
}
