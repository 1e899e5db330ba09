//! In-memory board model
//!
//! The sync layer replicates an *action stream*, but snapshot capture
//! and restoration need a concrete board to read from and write to:
//! per-side zones holding ordered card lists, card-level visual and
//! game state, attachment/evolution relationships, and board-level
//! orientation. Rule enforcement is out of scope — rule-level actions
//! are recorded opaquely — so the mutators here are the same ones a
//! rendering layer would call during live play, and restoration goes
//! through them rather than assigning fields directly.

use crate::action::{ActionKind, ActionParam, ActionRecord, Side};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Stable card identity
///
/// Minted once when the card object is created and never regenerated,
/// so relationships survive any number of capture/restore cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn mint() -> Self {
        CardId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        CardId(s.to_string())
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Board zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneId {
    Deck,
    Hand,
    Discard,
    Prizes,
    Active,
    Bench,
    Stadium,
    LostZone,
}

impl ZoneId {
    pub const ALL: [ZoneId; 8] = [
        ZoneId::Deck,
        ZoneId::Hand,
        ZoneId::Discard,
        ZoneId::Prizes,
        ZoneId::Active,
        ZoneId::Bench,
        ZoneId::Stadium,
        ZoneId::LostZone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ZoneId::Deck => "deck",
            ZoneId::Hand => "hand",
            ZoneId::Discard => "discard",
            ZoneId::Prizes => "prizes",
            ZoneId::Active => "active",
            ZoneId::Bench => "bench",
            ZoneId::Stadium => "stadium",
            ZoneId::LostZone => "lostZone",
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown zone: {0}")]
pub struct UnknownZone(String);

impl FromStr for ZoneId {
    type Err = UnknownZone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ZoneId::ALL
            .into_iter()
            .find(|z| z.name() == s)
            .ok_or_else(|| UnknownZone(s.to_string()))
    }
}

impl Serialize for ZoneId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ZoneId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Card position on the table, in board-relative units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Card-level visual state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardVisual {
    /// Rotation in degrees, multiples of 90
    pub rotation: i32,
    #[serde(rename = "faceDown")]
    pub face_down: bool,
    /// Whether the card is revealed to the opponent/spectators
    #[serde(rename = "public")]
    pub is_public: bool,
    pub position: Position,
}

impl Default for CardVisual {
    fn default() -> Self {
        Self {
            rotation: 0,
            face_down: false,
            is_public: true,
            position: Position::default(),
        }
    }
}

/// Card-level game state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CardCounters {
    #[serde(rename = "damageCounter")]
    pub damage: u32,
    #[serde(rename = "abilityCounter")]
    pub ability_used: bool,
    #[serde(rename = "specialCondition")]
    pub special_condition: Option<String>,
}

/// One card on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub url: String,
    pub visual: CardVisual,
    #[serde(rename = "gameState")]
    pub counters: CardCounters,
}

impl Card {
    pub fn new(name: impl Into<String>, card_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: CardId::mint(),
            name: name.into(),
            card_type: card_type.into(),
            url: url.into(),
            visual: CardVisual::default(),
            counters: CardCounters::default(),
        }
    }
}

/// Attachment/evolution link between two cards, by stable id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub parent: CardId,
    pub child: CardId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    Attachment,
    Evolution,
}

/// Board-level visual/orientation state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardVisual {
    /// Whether the local view is rendered flipped
    #[serde(rename = "boardFlipped")]
    pub board_flipped: bool,
    /// Whose turn the indicator shows
    #[serde(rename = "turnIndicator")]
    pub turn_indicator: Option<Side>,
    /// Own-side zones currently revealed to the opponent
    #[serde(rename = "revealedZones")]
    pub revealed_zones: BTreeSet<ZoneId>,
}

/// Turn/phase bookkeeping
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameMeta {
    pub turn: u32,
    pub phase: String,
    #[serde(rename = "lastAction")]
    pub last_action: Option<String>,
}

/// Opaque deck payload; card pools are out of scope
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckData(pub serde_json::Value);

/// Player identity as the board knows it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub username: String,
    #[serde(rename = "deckData")]
    pub deck: DeckData,
}

/// Per-side container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SideMap<T> {
    #[serde(rename = "self")]
    pub own: T,
    pub opp: T,
}

impl<T> SideMap<T> {
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Own => &self.own,
            Side::Opp => &self.opp,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Own => &mut self.own,
            Side::Opp => &mut self.opp,
        }
    }
}

/// Failures while applying an action or mutator to the board
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("missing parameter {index} for action {action}")]
    MissingParameter { action: String, index: usize },

    #[error("card not found: {0}")]
    CardNotFound(CardId),
}

type Zones = BTreeMap<ZoneId, Vec<Card>>;

fn empty_zones() -> Zones {
    ZoneId::ALL.into_iter().map(|z| (z, Vec::new())).collect()
}

/// The full local board: both sides' zones, relationships, identity,
/// and orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameBoard {
    pub players: SideMap<PlayerIdentity>,
    pub zones: SideMap<Zones>,
    pub relationships: Vec<Relationship>,
    pub visual: BoardVisual,
    pub meta: GameMeta,
}

impl Default for GameBoard {
    fn default() -> Self {
        Self {
            players: SideMap::default(),
            zones: SideMap {
                own: empty_zones(),
                opp: empty_zones(),
            },
            relationships: Vec::new(),
            visual: BoardVisual::default(),
            meta: GameMeta::default(),
        }
    }
}

impl GameBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear both sides' zones, relationships, counters, and visual
    /// state. Player identities survive a board reset.
    pub fn reset_board(&mut self) {
        self.zones = SideMap {
            own: empty_zones(),
            opp: empty_zones(),
        };
        self.relationships.clear();
        self.visual = BoardVisual::default();
        self.meta = GameMeta::default();
    }

    /// Record deck/identity data for one side.
    pub fn exchange_deck_data(&mut self, side: Side, username: String, deck: DeckData) {
        *self.players.get_mut(side) = PlayerIdentity { username, deck };
    }

    pub fn zone(&self, side: Side, zone: ZoneId) -> &[Card] {
        self.zones
            .get(side)
            .get(&zone)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn clear_zone(&mut self, side: Side, zone: ZoneId) {
        if let Some(cards) = self.zones.get_mut(side).get_mut(&zone) {
            cards.clear();
        }
    }

    /// Insert a card at `index` (clamped to the zone length).
    pub fn place_card(&mut self, side: Side, zone: ZoneId, index: usize, card: Card) {
        let cards = self.zones.get_mut(side).entry(zone).or_default();
        let index = index.min(cards.len());
        cards.insert(index, card);
    }

    /// Locate a card anywhere on the board.
    pub fn find_card(&self, id: &CardId) -> Option<(Side, ZoneId, usize)> {
        for side in [Side::Own, Side::Opp] {
            for (zone, cards) in self.zones.get(side) {
                if let Some(index) = cards.iter().position(|c| &c.id == id) {
                    return Some((side, *zone, index));
                }
            }
        }
        None
    }

    fn card_mut(&mut self, id: &CardId) -> Result<&mut Card, ApplyError> {
        let (side, zone, index) = self
            .find_card(id)
            .ok_or_else(|| ApplyError::CardNotFound(id.clone()))?;
        Ok(&mut self.zones.get_mut(side).get_mut(&zone).expect("located zone")[index])
    }

    pub fn move_card(
        &mut self,
        id: &CardId,
        to_side: Side,
        to_zone: ZoneId,
        to_index: usize,
    ) -> Result<(), ApplyError> {
        let (side, zone, index) = self
            .find_card(id)
            .ok_or_else(|| ApplyError::CardNotFound(id.clone()))?;
        let card = self
            .zones
            .get_mut(side)
            .get_mut(&zone)
            .expect("located zone")
            .remove(index);
        self.place_card(to_side, to_zone, to_index, card);
        Ok(())
    }

    pub fn set_rotation(&mut self, id: &CardId, rotation: i32) -> Result<(), ApplyError> {
        self.card_mut(id)?.visual.rotation = rotation;
        Ok(())
    }

    pub fn set_face_down(&mut self, id: &CardId, face_down: bool) -> Result<(), ApplyError> {
        self.card_mut(id)?.visual.face_down = face_down;
        Ok(())
    }

    pub fn set_public(&mut self, id: &CardId, is_public: bool) -> Result<(), ApplyError> {
        self.card_mut(id)?.visual.is_public = is_public;
        Ok(())
    }

    pub fn set_position(&mut self, id: &CardId, position: Position) -> Result<(), ApplyError> {
        self.card_mut(id)?.visual.position = position;
        Ok(())
    }

    pub fn set_damage(&mut self, id: &CardId, damage: u32) -> Result<(), ApplyError> {
        self.card_mut(id)?.counters.damage = damage;
        Ok(())
    }

    pub fn set_ability_used(&mut self, id: &CardId, used: bool) -> Result<(), ApplyError> {
        self.card_mut(id)?.counters.ability_used = used;
        Ok(())
    }

    pub fn set_special_condition(
        &mut self,
        id: &CardId,
        condition: Option<String>,
    ) -> Result<(), ApplyError> {
        self.card_mut(id)?.counters.special_condition = condition;
        Ok(())
    }

    /// Link two cards by id. Both must exist on the board.
    pub fn link(
        &mut self,
        kind: RelationshipKind,
        parent: &CardId,
        child: &CardId,
    ) -> Result<(), ApplyError> {
        if self.find_card(parent).is_none() {
            return Err(ApplyError::CardNotFound(parent.clone()));
        }
        if self.find_card(child).is_none() {
            return Err(ApplyError::CardNotFound(child.clone()));
        }
        let relationship = Relationship {
            kind,
            parent: parent.clone(),
            child: child.clone(),
        };
        if !self.relationships.contains(&relationship) {
            self.relationships.push(relationship);
        }
        Ok(())
    }

    /// Apply one replicated action. Bookkeeping actions mutate
    /// identity/board structure; rule-level actions are recorded
    /// opaquely (rendering and rules live outside this crate).
    pub fn apply(&mut self, record: &ActionRecord) -> Result<(), ApplyError> {
        match &record.kind {
            ActionKind::ExchangeData | ActionKind::LoadDeckData => {
                let username = match record.parameters.get(1) {
                    Some(ActionParam::Text(name)) => name.clone(),
                    Some(_) | None if record.kind == ActionKind::LoadDeckData => {
                        self.players.get(record.side).username.clone()
                    }
                    _ => {
                        return Err(ApplyError::MissingParameter {
                            action: record.kind.name().to_string(),
                            index: 1,
                        })
                    }
                };
                let deck = match record.parameters.get(2) {
                    Some(ActionParam::Json(value)) => DeckData(value.clone()),
                    _ => DeckData::default(),
                };
                self.exchange_deck_data(record.side, username, deck);
            }
            ActionKind::Reset => {
                self.reset_board();
            }
            ActionKind::Setup => {
                self.meta.phase = "setup".to_string();
            }
            ActionKind::Game(name) => {
                self.meta.last_action = Some(name.clone());
            }
        }
        Ok(())
    }
}
