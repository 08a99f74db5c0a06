//! GroupSession – Transition-Koordinator einer Voice-Verbindung
//!
//! Steuert anhand der Gateway-Events die MLS-Engine und schaltet die
//! Kryptoren um. Wechsel der Protokollversion laufen zweiphasig:
//!
//! 1. **Prepare**: alle Decryptoren bekommen den neuen Ratchet sofort
//!    (ein zu frueh scharf geschalteter Empfaenger schadet nicht).
//! 2. **Execute**: erst jetzt wechselt der eigene Encryptor, damit kein
//!    Teilnehmer Frames sendet die andere noch nicht lesen koennen.
//!
//! Transition 0 ist die Init-Transition: sie wird bei Prepare sofort
//! vollstaendig angewendet und nie vorgemerkt oder quittiert.
//!
//! ## Zustaende
//! ```text
//! Uninitialisiert -> Bootstrap(Aktiviert|Deaktiviert) -> Bereit
//! Bereit -> Wiederherstellung -> Bootstrap   (fehlgeschlagener Commit)
//! ```

use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use voxmls_core::{
    ChannelId, Epoch, InboundEvent, ParticipantId, ProtocolVersion, TransitionId, VoxError,
    VoxResult, DISABLED_PROTOCOL_VERSION, INIT_TRANSITION_ID, NEW_GROUP_EPOCH,
};

use crate::callbacks::GatewayCallbacks;
use crate::e2e::{CryptorFactory, FrameDecryptor, FrameEncryptor};
use crate::engine::{CommitOutcome, GroupEngine, Roster};
use crate::error::GatewayError;
use crate::session::media::{DecryptorMap, MediaHandle, MediaPfad};
use crate::session::{SessionStatus, VoiceSession};
use crate::types::CryptorStats;

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

/// Art des laufenden Bootstraps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapModus {
    /// Version > 0: Engine initialisiert, warten auf Commit/Welcome
    Aktiviert,
    /// Version 0: Passthrough fuer alle
    Deaktiviert,
}

/// Lebenszyklus einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialisiert,
    Bootstrap(BootstrapModus),
    Bereit,
    Wiederherstellung,
}

/// Ziel einer Ratchet-Einrichtung
///
/// Remote-Ziele koennen nur mit einem vorhandenen Decryptor gebildet werden.
enum RatchetTarget<'a, D> {
    Selbst,
    Remote {
        teilnehmer: ParticipantId,
        decryptor: &'a D,
    },
}

// ---------------------------------------------------------------------------
// GroupSession
// ---------------------------------------------------------------------------

/// Session einer Voice-Verbindung mit MLS-Gruppenverschluesselung
pub struct GroupSession<G, C, F>
where
    G: GroupEngine,
    C: GatewayCallbacks,
    F: CryptorFactory,
{
    self_id: ParticipantId,
    channel_id: Option<ChannelId>,
    engine: G,
    callbacks: C,
    factory: F,
    encryptor: Arc<F::Encryptor>,
    decryptors: DecryptorMap<F::Decryptor>,
    prepared_transitions: HashMap<TransitionId, ProtocolVersion>,
    state: SessionState,
    max_version: ProtocolVersion,
    letzter_roster: Roster,
}

impl<G, C, F> GroupSession<G, C, F>
where
    G: GroupEngine,
    C: GatewayCallbacks,
    F: CryptorFactory,
{
    /// Erstellt eine neue Session; der Encryptor startet im Passthrough
    pub fn new(self_id: ParticipantId, engine: G, callbacks: C, factory: F) -> Self {
        let encryptor = factory.encryptor();
        encryptor.set_passthrough_mode(true);

        Self {
            self_id,
            channel_id: None,
            engine,
            callbacks,
            factory,
            encryptor: Arc::new(encryptor),
            decryptors: Arc::new(DashMap::new()),
            prepared_transitions: HashMap::new(),
            state: SessionState::Uninitialisiert,
            max_version: ProtocolVersion(u16::MAX),
            letzter_roster: Roster::new(),
        }
    }

    /// Begrenzt die angebotene maximale Protokollversion
    pub fn mit_max_version(mut self, max_version: ProtocolVersion) -> Self {
        self.max_version = max_version;
        self
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Aktive Protokollversion laut Engine
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.engine.protocol_version()
    }

    /// Hoechste Version die dem Gateway angeboten wird
    pub fn max_supported_protocol_version(&self) -> ProtocolVersion {
        self.engine
            .max_supported_protocol_version()
            .min(self.max_version)
    }

    /// Authenticator der letzten Epoch (Verifikations-Code)
    pub fn epoch_authenticator(&self) -> Vec<u8> {
        self.engine.last_epoch_authenticator()
    }

    /// Roster des zuletzt angewendeten Commits/Welcomes
    pub fn roster(&self) -> &Roster {
        &self.letzter_roster
    }

    pub fn engine(&self) -> &G {
        &self.engine
    }

    /// Bekannte Remote-Teilnehmer (sortiert)
    pub fn teilnehmer(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.decryptors.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    pub fn has_decryptor(&self, teilnehmer: ParticipantId) -> bool {
        self.decryptors.contains_key(&teilnehmer)
    }

    /// Vorgemerkte Version einer Transition
    pub fn prepared_transition(&self, id: TransitionId) -> Option<ProtocolVersion> {
        self.prepared_transitions.get(&id).copied()
    }

    pub fn prepared_transition_count(&self) -> usize {
        self.prepared_transitions.len()
    }

    pub fn encryptor(&self) -> &F::Encryptor {
        &self.encryptor
    }

    pub fn encryptor_stats(&self) -> CryptorStats {
        self.encryptor.stats()
    }

    /// Handle fuer den Media-Pfad (Audio-Threads)
    pub fn media(&self) -> MediaHandle<F::Encryptor, F::Decryptor> {
        MediaHandle::new(Arc::clone(&self.encryptor), Arc::clone(&self.decryptors))
    }

    /// Setzt die Kanal-ID; darf danach nicht mehr wechseln.
    /// Ein Epoch-Bootstrap ohne Kanal-ID bindet die Session an Kanal 0.
    pub fn set_channel_id(&mut self, channel_id: ChannelId) -> VoxResult<()> {
        match self.channel_id {
            Some(aktuell) if aktuell != channel_id => Err(VoxError::KanalBereitsGesetzt {
                aktuell,
                angefragt: channel_id,
            }),
            _ => {
                self.channel_id = Some(channel_id);
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    /// Ausgehandelte Protokollversion vom Gateway
    pub fn on_select_protocol_ack(&mut self, version: ProtocolVersion) {
        tracing::info!(version = %version, "Protokollversion ausgehandelt");
        self.protocol_init(version);
    }

    /// Setzt die Session auf einen definierten Bootstrap-Zustand
    fn protocol_init(&mut self, version: ProtocolVersion) {
        if version.is_disabled() {
            self.zustand_setzen(SessionState::Bootstrap(BootstrapModus::Deaktiviert));
            self.prepare_transition(INIT_TRANSITION_ID, DISABLED_PROTOCOL_VERSION);
            self.execute_transition(INIT_TRANSITION_ID);
            self.zustand_setzen(SessionState::Bereit);
        } else {
            self.zustand_setzen(SessionState::Bootstrap(BootstrapModus::Aktiviert));
            self.prepare_epoch(NEW_GROUP_EPOCH, version);
            self.send_key_package();
        }
    }

    // -----------------------------------------------------------------------
    // Epoch
    // -----------------------------------------------------------------------

    /// Eingehendes Prepare-Epoch; bei Epoch 1 wird das Key-Package gesendet
    pub fn on_prepare_epoch(&mut self, epoch: Epoch, version: ProtocolVersion) {
        self.prepare_epoch(epoch, version);
        if epoch.is_new_group() {
            self.zustand_setzen(SessionState::Bootstrap(BootstrapModus::Aktiviert));
            self.send_key_package();
        }
    }

    /// Initialisiert die Engine fuer eine neue Gruppe (nur Epoch 1)
    pub fn prepare_epoch(&mut self, epoch: Epoch, version: ProtocolVersion) {
        if !epoch.is_new_group() {
            tracing::debug!(epoch = epoch.0, "Epoch ohne Neugruendung – ignoriert");
            return;
        }

        // Die Engine kennt ab hier ihren Kanal; ein spaeteres set_channel_id
        // mit anderer ID wird abgelehnt
        let channel_id = *self.channel_id.get_or_insert_with(|| {
            tracing::warn!("Epoch-Bootstrap ohne Kanal-ID – verwende Kanal 0");
            ChannelId::default()
        });

        tracing::debug!(
            epoch = epoch.0,
            version = %version,
            kanal = %channel_id,
            "Engine fuer neue Gruppe initialisiert"
        );
        self.engine.init(version, channel_id, self.self_id);
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Eingehendes Prepare-Transition; quittiert alle ausser Transition 0
    pub fn on_prepare_transition(&mut self, id: TransitionId, version: ProtocolVersion) {
        self.prepare_transition(id, version);
        if !id.is_init() {
            self.send_ready_for_transition(id);
        }
    }

    /// Schaltet alle Decryptoren auf `version`; merkt die Transition fuer
    /// den Encryptor vor (Transition 0: sofort anwenden)
    pub fn prepare_transition(&mut self, id: TransitionId, version: ProtocolVersion) {
        tracing::debug!(transition_id = id.0, version = %version, "Transition vorbereiten");

        // Handles zuerst einsammeln: kein DashMap-Lock waehrend Engine-Aufrufen
        let remotes: Vec<_> = self
            .decryptors
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();
        for (teilnehmer, decryptor) in &remotes {
            self.ratchet_einrichten(
                RatchetTarget::Remote {
                    teilnehmer: *teilnehmer,
                    decryptor: decryptor.as_ref(),
                },
                version,
            );
        }

        if id.is_init() {
            self.ratchet_einrichten(RatchetTarget::Selbst, version);
            return;
        }

        if let Some(vorher) = self.prepared_transitions.insert(id, version) {
            // Die Quittung fuer die vorherige Version ist damit hinfaellig
            tracing::debug!(
                transition_id = id.0,
                vorher = %vorher,
                version = %version,
                "Vorgemerkte Transition ueberschrieben"
            );
        }
    }

    /// Eingehendes Execute-Transition
    pub fn on_execute_transition(&mut self, id: TransitionId) {
        self.execute_transition(id);
    }

    /// Schaltet den Encryptor auf die vorgemerkte Version
    pub fn execute_transition(&mut self, id: TransitionId) {
        let Some(version) = self.prepared_transitions.remove(&id) else {
            tracing::debug!(transition_id = id.0, "Unbekannte Transition – ignoriert");
            return;
        };

        if version.is_disabled() {
            tracing::info!(transition_id = id.0, "Wechsel auf Passthrough – Gruppe verworfen");
            self.engine.reset();
        }

        self.ratchet_einrichten(RatchetTarget::Selbst, version);
        tracing::info!(transition_id = id.0, version = %version, "Transition ausgefuehrt");
    }

    /// Einziger Ort an dem Kryptor-Modi wechseln
    fn ratchet_einrichten(&self, ziel: RatchetTarget<'_, F::Decryptor>, version: ProtocolVersion) {
        let deaktiviert = version.is_disabled();

        match ziel {
            RatchetTarget::Selbst => {
                if deaktiviert {
                    self.encryptor.set_passthrough_mode(true);
                    return;
                }
                match self.engine.key_ratchet_for(&self.self_id.to_string()) {
                    Some(ratchet) => self.encryptor.set_key_ratchet(ratchet),
                    None => {
                        tracing::warn!(
                            version = %version,
                            "Engine liefert keinen eigenen Ratchet – Senden gesperrt"
                        );
                        self.encryptor.clear_key_ratchet();
                    }
                }
                self.encryptor.set_passthrough_mode(false);
            }
            RatchetTarget::Remote {
                teilnehmer,
                decryptor,
            } => {
                decryptor.transition_to_passthrough_mode(deaktiviert);
                if deaktiviert {
                    return;
                }
                match self.engine.key_ratchet_for(&teilnehmer.to_string()) {
                    Some(ratchet) => decryptor.transition_to_key_ratchet(ratchet),
                    None => {
                        tracing::warn!(
                            teilnehmer = %teilnehmer,
                            version = %version,
                            "Engine liefert keinen Ratchet fuer Teilnehmer"
                        );
                        decryptor.clear_key_ratchet();
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mitglieder
    // -----------------------------------------------------------------------

    /// Neuer Remote-Teilnehmer; wird sofort auf den aktuellen Stand gebracht
    pub fn add_user(&mut self, teilnehmer: ParticipantId) {
        if teilnehmer == self.self_id {
            tracing::warn!(teilnehmer = %teilnehmer, "Eigene ID als Teilnehmer gemeldet – ignoriert");
            return;
        }

        let decryptor = Arc::new(self.factory.decryptor());
        if self
            .decryptors
            .insert(teilnehmer, Arc::clone(&decryptor))
            .is_some()
        {
            tracing::debug!(teilnehmer = %teilnehmer, "Teilnehmer bereits bekannt – Decryptor ersetzt");
        }

        let version = self.engine.protocol_version();
        self.ratchet_einrichten(
            RatchetTarget::Remote {
                teilnehmer,
                decryptor: decryptor.as_ref(),
            },
            version,
        );
        tracing::debug!(teilnehmer = %teilnehmer, version = %version, "Teilnehmer hinzugefuegt");
    }

    /// Entfernt einen Remote-Teilnehmer samt Decryptor
    pub fn remove_user(&mut self, teilnehmer: ParticipantId) {
        if self.decryptors.remove(&teilnehmer).is_some() {
            tracing::debug!(teilnehmer = %teilnehmer, "Teilnehmer entfernt");
        } else {
            tracing::debug!(teilnehmer = %teilnehmer, "Unbekannter Teilnehmer – nichts zu entfernen");
        }
    }

    /// Eigene ID plus alle Remote-Teilnehmer als Dezimal-Strings
    fn recognized_ids(&self) -> BTreeSet<String> {
        std::iter::once(self.self_id)
            .chain(self.decryptors.iter().map(|e| *e.key()))
            .map(|id| id.to_string())
            .collect()
    }

    // -----------------------------------------------------------------------
    // MLS-Nachrichten
    // -----------------------------------------------------------------------

    /// Externer Sender der Gruppe
    pub fn on_external_sender(&mut self, package: &[u8]) {
        tracing::debug!(bytes = package.len(), "Externer Sender gesetzt");
        self.engine.set_external_sender(package);
    }

    /// Proposals; ein entstandenes Commit/Welcome-Bundle wird gesendet
    pub fn on_proposals(&mut self, proposals: &[u8]) {
        let recognized = self.recognized_ids();
        match self.engine.process_proposals(proposals, &recognized) {
            Some(commit_welcome) => {
                tracing::debug!(bytes = commit_welcome.len(), "Commit/Welcome erzeugt");
                let result = self.callbacks.send_commit_welcome(commit_welcome);
                melden("Commit/Welcome", result);
            }
            None => tracing::debug!("Proposals ohne eigenen Commit verarbeitet"),
        }
    }

    /// Angekuendigter Commit
    pub fn on_prepare_commit_transition(&mut self, id: TransitionId, commit: &[u8]) {
        match self.engine.process_commit(commit) {
            CommitOutcome::Ignored => {
                tracing::debug!(transition_id = id.0, "Commit ignoriert");
            }
            CommitOutcome::Failed => {
                tracing::warn!(transition_id = id.0, "Commit ungueltig – Protokoll wird neu initialisiert");
                self.send_invalid_commit_welcome(id);
                self.zustand_setzen(SessionState::Wiederherstellung);
                let version = self.engine.protocol_version();
                self.protocol_init(version);
            }
            CommitOutcome::Success(roster) => {
                self.gruppe_beigetreten(id, roster);
            }
        }
    }

    /// Welcome fuer den eigenen Beitritt
    pub fn on_welcome(&mut self, id: TransitionId, welcome: &[u8]) {
        let recognized = self.recognized_ids();
        match self.engine.process_welcome(welcome, &recognized) {
            Some(roster) => self.gruppe_beigetreten(id, roster),
            None => {
                tracing::warn!(transition_id = id.0, "Welcome abgelehnt – Key-Package erneut gesendet");
                self.send_invalid_commit_welcome(id);
                self.send_key_package();
            }
        }
    }

    /// Commit/Welcome angenommen: Transition auf die neue Engine-Version
    fn gruppe_beigetreten(&mut self, id: TransitionId, roster: Roster) {
        let version = self.engine.protocol_version();
        tracing::info!(
            transition_id = id.0,
            version = %version,
            mitglieder = roster.len(),
            "Gruppenzustand aktualisiert"
        );
        self.letzter_roster = roster;

        self.prepare_transition(id, version);
        if !id.is_init() {
            self.send_ready_for_transition(id);
        }
        self.zustand_setzen(SessionState::Bereit);
    }

    // -----------------------------------------------------------------------
    // Event-Dispatch
    // -----------------------------------------------------------------------

    /// Wendet ein Gateway-Event an
    pub fn handle_event(&mut self, event: InboundEvent) {
        tracing::trace!(opcode = ?event.opcode(), "Gateway-Event");
        match event {
            InboundEvent::SelectProtocolAck { protocol_version } => {
                self.on_select_protocol_ack(protocol_version)
            }
            InboundEvent::ClientsConnect { user_ids } => {
                for id in user_ids {
                    self.add_user(id);
                }
            }
            InboundEvent::ClientDisconnect { user_id } => self.remove_user(user_id),
            InboundEvent::PrepareTransition {
                transition_id,
                protocol_version,
            } => self.on_prepare_transition(transition_id, protocol_version),
            InboundEvent::ExecuteTransition { transition_id } => {
                self.on_execute_transition(transition_id)
            }
            InboundEvent::PrepareEpoch {
                epoch,
                protocol_version,
            } => self.on_prepare_epoch(epoch, protocol_version),
            InboundEvent::ExternalSenderPackage { package } => self.on_external_sender(&package),
            InboundEvent::Proposals { proposals } => self.on_proposals(&proposals),
            InboundEvent::PrepareCommitTransition {
                transition_id,
                commit,
            } => self.on_prepare_commit_transition(transition_id, &commit),
            InboundEvent::Welcome {
                transition_id,
                welcome,
            } => self.on_welcome(transition_id, &welcome),
        }
    }

    // -----------------------------------------------------------------------
    // Ausgehend
    // -----------------------------------------------------------------------

    fn send_key_package(&mut self) {
        let key_package = self.engine.key_package();
        let result = self.callbacks.send_key_package(key_package);
        melden("Key-Package", result);
    }

    fn send_ready_for_transition(&self, id: TransitionId) {
        let result = self.callbacks.send_ready_for_transition(id);
        melden("Ready-for-Transition", result);
    }

    fn send_invalid_commit_welcome(&self, id: TransitionId) {
        let result = self.callbacks.send_invalid_commit_welcome(id);
        melden("Invalid-Commit-Welcome", result);
    }

    fn zustand_setzen(&mut self, neu: SessionState) {
        if self.state != neu {
            tracing::debug!(von = ?self.state, nach = ?neu, "Session-Zustand");
            self.state = neu;
        }
    }
}

/// Loggt einen fehlgeschlagenen Versand; der lokale Zustand bleibt gueltig
fn melden(was: &'static str, result: Result<(), GatewayError>) {
    if let Err(e) = result {
        tracing::error!(nachricht = was, fehler = %e, "Senden an Gateway fehlgeschlagen");
    }
}

impl<G, C, F> VoiceSession for GroupSession<G, C, F>
where
    G: GroupEngine,
    C: GatewayCallbacks,
    F: CryptorFactory,
{
    fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    fn max_supported_protocol_version(&self) -> ProtocolVersion {
        GroupSession::max_supported_protocol_version(self)
    }

    fn set_channel_id(&mut self, channel_id: ChannelId) -> VoxResult<()> {
        GroupSession::set_channel_id(self, channel_id)
    }

    fn handle_event(&mut self, event: InboundEvent) {
        GroupSession::handle_event(self, event)
    }

    fn media(&self) -> Arc<dyn MediaPfad> {
        Arc::new(GroupSession::media(self))
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            protocol_version: self.engine.protocol_version(),
            teilnehmer: self.decryptors.len(),
            offene_transitions: self.prepared_transitions.len(),
        }
    }
}
