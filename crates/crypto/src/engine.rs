//! Schnittstelle zur MLS-Group-Engine
//!
//! Die Engine verwaltet den eigentlichen Gruppenzustand (Key-Packages,
//! Proposals, Commits, Welcomes) und leitet pro Mitglied einen Key-Ratchet
//! ab. Der Session-Koordinator ruft sie nur synchron aus dem Control-Plane
//! auf; Teilnehmer-IDs werden dabei als Dezimal-Strings uebergeben.

use std::collections::{BTreeMap, BTreeSet};

use voxmls_core::{ChannelId, ParticipantId, ProtocolVersion};

use crate::e2e::KeyRatchetHandle;

/// Mitglieder-Roster nach einem Commit/Welcome: Teilnehmer -> Signatur-Key
///
/// Ein leerer Key bedeutet: Mitglied wurde entfernt.
pub type Roster = BTreeMap<u64, Vec<u8>>;

/// Ergebnis von `GroupEngine::process_commit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Veraltet, doppelt oder selbst erzeugt
    Ignored,
    /// Kryptografisch ungueltig oder inkonsistent zum lokalen Zustand
    Failed,
    /// Angewendet; Roster der neuen Epoch
    Success(Roster),
}

impl CommitOutcome {
    pub fn ist_erfolg(&self) -> bool {
        matches!(self, CommitOutcome::Success(_))
    }
}

/// MLS-Gruppen-Engine eines Clients
pub trait GroupEngine: Send + 'static {
    /// Initialisiert den Gruppenzustand fuer eine neue Epoch
    fn init(&mut self, version: ProtocolVersion, channel_id: ChannelId, self_id: ParticipantId);

    /// Verwirft den gesamten Gruppenzustand
    fn reset(&mut self);

    /// Aktuell aktive Protokollversion (0 = deaktiviert)
    fn protocol_version(&self) -> ProtocolVersion;

    /// Hoechste Protokollversion die diese Engine unterstuetzt
    fn max_supported_protocol_version(&self) -> ProtocolVersion;

    /// Setzt den vertrauenswuerdigen externen Sender (Voice-Gateway)
    fn set_external_sender(&mut self, package: &[u8]);

    /// Verarbeitet Proposals; liefert ggf. ein Commit+Welcome-Bundle
    fn process_proposals(
        &mut self,
        proposals: &[u8],
        recognized: &BTreeSet<String>,
    ) -> Option<Vec<u8>>;

    /// Wendet einen eingehenden Commit an
    fn process_commit(&mut self, commit: &[u8]) -> CommitOutcome;

    /// Tritt per Welcome einer bestehenden Gruppe bei; None = abgelehnt
    fn process_welcome(&mut self, welcome: &[u8], recognized: &BTreeSet<String>)
        -> Option<Roster>;

    /// Eigenes Key-Package (serialisiert)
    fn key_package(&mut self) -> Vec<u8>;

    /// Key-Ratchet eines Mitglieds; None wenn die Engine es nicht kennt
    fn key_ratchet_for(&self, user_id: &str) -> Option<KeyRatchetHandle>;

    /// Authenticator der letzten Epoch (fuer Verifikations-Codes)
    fn last_epoch_authenticator(&self) -> Vec<u8>;
}
