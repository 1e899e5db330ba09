//! Snapshot codec
//!
//! A snapshot is a versioned, checksummed, fully-serialized capture
//! of the game at a point in time: identity, counters, zones,
//! relationships, orientation, and the action history needed for the
//! replay fallback. Snapshots serve two masters — periodic autosave
//! and the compact resync payload for long games — and are consumed
//! exactly once per restoration.
//!
//! The checksum is a SHA-256 content hash over the JSON serialization
//! with the checksum field emptied. Peers are mutually trusting, so
//! this detects corruption, not tampering.

pub mod restore;
pub mod storage;

pub use restore::{restore_snapshot, RestoreOutcome};
pub use storage::{InMemorySnapshotStore, SnapshotStore};

use crate::action::{ActionRecord, Side};
use crate::errors::{IntegrityError, Result, SnapshotError};
use crate::game::{BoardVisual, Card, DeckData, GameBoard, GameMeta, SideMap, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Next step after a failed restoration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    /// The snapshot carried action history; replay it instead
    ReplayHistory,
    /// Nothing to recover from; start a fresh session
    FreshSession,
}

/// Per-player identity and progress as captured
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    #[serde(rename = "deckData")]
    pub deck: DeckData,
    #[serde(rename = "actionCounter")]
    pub action_counter: u64,
}

/// Both players, from the capturing peer's perspective
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotPlayers {
    #[serde(rename = "self")]
    pub own: PlayerInfo,
    pub opponent: PlayerInfo,
}

/// Where a captured card sits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardLocation {
    #[serde(rename = "player")]
    pub side: Side,
    pub zone: ZoneId,
    pub index: usize,
}

/// One card as captured inside a snapshot zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    #[serde(flatten)]
    pub card: Card,
    pub location: CardLocation,
}

/// Both sides' action logs, for the replay fallback
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionHistory {
    #[serde(rename = "self")]
    pub own: Vec<ActionRecord>,
    pub opp: Vec<ActionRecord>,
}

/// Complete point-in-time capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Capture time, unix millis
    pub timestamp: i64,
    #[serde(rename = "snapshotId")]
    pub snapshot_id: String,
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub players: SnapshotPlayers,
    #[serde(rename = "gameState")]
    pub game_state: GameMeta,
    /// Per-side, per-zone ordered card lists
    pub zones: SideMap<BTreeMap<ZoneId, Vec<CardState>>>,
    /// Attachment/evolution links by stable card id
    pub relationships: Vec<crate::game::Relationship>,
    #[serde(rename = "visualState")]
    pub visual_state: BoardVisual,
    #[serde(rename = "actionHistory")]
    pub action_history: ActionHistory,
    /// SHA-256 hex over the JSON form with this field emptied;
    /// empty string means the capture was never checksummed
    #[serde(default)]
    pub checksum: String,
}

impl Snapshot {
    /// Capture the current board and history into a checksummed
    /// snapshot.
    pub fn capture(
        room_id: &str,
        board: &GameBoard,
        history: ActionHistory,
    ) -> Result<Snapshot> {
        let own_counter = history.own.len() as u64;
        let opp_counter = history.opp.len() as u64;

        let mut zones: SideMap<BTreeMap<ZoneId, Vec<CardState>>> = SideMap::default();
        for side in [Side::Own, Side::Opp] {
            let captured = zones.get_mut(side);
            for zone in ZoneId::ALL {
                let cards = board
                    .zone(side, zone)
                    .iter()
                    .enumerate()
                    .map(|(index, card)| CardState {
                        card: card.clone(),
                        location: CardLocation { side, zone, index },
                    })
                    .collect::<Vec<_>>();
                if !cards.is_empty() {
                    captured.insert(zone, cards);
                }
            }
        }

        let mut snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now().timestamp_millis(),
            snapshot_id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            players: SnapshotPlayers {
                own: PlayerInfo {
                    username: board.players.own.username.clone(),
                    deck: board.players.own.deck.clone(),
                    action_counter: own_counter,
                },
                opponent: PlayerInfo {
                    username: board.players.opp.username.clone(),
                    deck: board.players.opp.deck.clone(),
                    action_counter: opp_counter,
                },
            },
            game_state: board.meta.clone(),
            zones,
            relationships: board.relationships.clone(),
            visual_state: board.visual.clone(),
            action_history: history,
            checksum: String::new(),
        };
        snapshot.checksum = snapshot.compute_checksum()?;
        Ok(snapshot)
    }

    /// Content hash over the JSON form with the checksum field
    /// emptied.
    pub fn compute_checksum(&self) -> Result<String> {
        let mut unchecksummed = self.clone();
        unchecksummed.checksum = String::new();
        let data = serde_json::to_vec(&unchecksummed).map_err(SnapshotError::Serialize)?;
        Ok(crate::utils::content_hash(&data))
    }

    /// Integrity verification on ingestion: required fields plus the
    /// checksum, when one is present. A mismatch rejects the snapshot
    /// outright — restoration never partially applies a corrupt
    /// capture.
    pub fn verify(&self) -> Result<()> {
        if self.version > SNAPSHOT_VERSION {
            return Err(IntegrityError::UnsupportedVersion {
                version: self.version,
            }
            .into());
        }
        if self.room_id.is_empty() {
            return Err(IntegrityError::MissingField { field: "roomId" }.into());
        }
        if self.players.own.username.is_empty() && self.players.opponent.username.is_empty() {
            return Err(IntegrityError::MissingField { field: "players" }.into());
        }
        if !self.checksum.is_empty() {
            let computed = self.compute_checksum()?;
            if computed != self.checksum {
                return Err(IntegrityError::ChecksumMismatch {
                    expected: self.checksum.clone(),
                    computed,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Re-read the capture from the other peer's perspective.
    ///
    /// Snapshots use the same perspective-relative encoding as action
    /// records: the capturing peer's `self` is the receiving peer's
    /// `opp`. Ingesting a peer snapshot therefore swaps players,
    /// zones, history sides, and every `Side`-typed field, then
    /// re-checksums the flipped form.
    pub fn flipped(&self) -> Result<Snapshot> {
        let flip_zone = |zones: &BTreeMap<ZoneId, Vec<CardState>>| {
            zones
                .iter()
                .map(|(zone, cards)| {
                    let cards = cards
                        .iter()
                        .map(|state| {
                            let mut state = state.clone();
                            state.location.side = state.location.side.flipped();
                            state
                        })
                        .collect();
                    (*zone, cards)
                })
                .collect::<BTreeMap<ZoneId, Vec<CardState>>>()
        };
        let flip_records =
            |records: &[ActionRecord]| records.iter().map(ActionRecord::flipped).collect();

        let mut flipped = Snapshot {
            version: self.version,
            timestamp: self.timestamp,
            snapshot_id: self.snapshot_id.clone(),
            room_id: self.room_id.clone(),
            players: SnapshotPlayers {
                own: self.players.opponent.clone(),
                opponent: self.players.own.clone(),
            },
            game_state: self.game_state.clone(),
            zones: SideMap {
                own: flip_zone(&self.zones.opp),
                opp: flip_zone(&self.zones.own),
            },
            relationships: self.relationships.clone(),
            visual_state: BoardVisual {
                board_flipped: self.visual_state.board_flipped,
                turn_indicator: self.visual_state.turn_indicator.map(Side::flipped),
                revealed_zones: self.visual_state.revealed_zones.clone(),
            },
            action_history: ActionHistory {
                own: flip_records(&self.action_history.opp),
                opp: flip_records(&self.action_history.own),
            },
            checksum: String::new(),
        };
        flipped.checksum = flipped.compute_checksum()?;
        Ok(flipped)
    }

    /// Serialize for the persistence envelope.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Serialize(e).into())
    }

    /// Deserialize from the persistence envelope.
    pub fn from_json(raw: &str) -> Result<Snapshot> {
        serde_json::from_str(raw).map_err(|e| SnapshotError::Deserialize(e).into())
    }
}
