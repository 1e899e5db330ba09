//! Action data model
//!
//! Actions are the unit of replication: every game move a client
//! performs is recorded as an [`ActionRecord`], appended to the local
//! action log, and broadcast to the peer. Records use a
//! perspective-relative encoding — `self`/`opp` mean "me"/"my
//! opponent" *from the recording peer's point of view* — so one wire
//! format serves both peers symmetrically. A record crossing the wire
//! must be re-read through [`ActionRecord::flipped`] before replay.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Perspective-relative player identifier
///
/// Serialized as `"self"` / `"opp"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "self")]
    Own,
    #[serde(rename = "opp")]
    Opp,
}

impl Side {
    /// Total perspective flip: how the other peer names this side.
    pub fn flipped(self) -> Side {
        match self {
            Side::Own => Side::Opp,
            Side::Opp => Side::Own,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Own => write!(f, "self"),
            Side::Opp => write!(f, "opp"),
        }
    }
}

/// Action discriminant
///
/// The sync layer only interprets the bookkeeping variants; every
/// rule-level move travels as `Game` and is applied opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Deck/identity bootstrap exchanged when both players are seated
    ExchangeData,
    /// Deck data (re)load for one side
    LoadDeckData,
    /// Full board reset
    Reset,
    /// Board setup after a reset
    Setup,
    /// Any rule-level game action, carried by name
    Game(String),
}

impl ActionKind {
    /// Parse from the wire name; unknown names become `Game` actions.
    pub fn from_name(name: &str) -> ActionKind {
        match name {
            "exchangeData" => ActionKind::ExchangeData,
            "loadDeckData" => ActionKind::LoadDeckData,
            "reset" => ActionKind::Reset,
            "setup" => ActionKind::Setup,
            other => ActionKind::Game(other.to_string()),
        }
    }

    /// Wire name of the action
    pub fn name(&self) -> &str {
        match self {
            ActionKind::ExchangeData => "exchangeData",
            ActionKind::LoadDeckData => "loadDeckData",
            ActionKind::Reset => "reset",
            ActionKind::Setup => "setup",
            ActionKind::Game(name) => name,
        }
    }

    /// Deck/identity bootstrap actions get special replay ordering
    /// during catch-up and are kept out of the spectator export log.
    pub fn is_deck_bootstrap(&self) -> bool {
        matches!(self, ActionKind::ExchangeData | ActionKind::LoadDeckData)
    }

    /// Board-reset markers supersede older deck data during catch-up.
    pub fn is_board_reset(&self) -> bool {
        matches!(self, ActionKind::Reset | ActionKind::Setup)
    }
}

impl FromStr for ActionKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ActionKind::from_name(s))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ActionKind::from_name(&name))
    }
}

/// One action parameter
///
/// The original system shipped parameters as a dynamically typed
/// array with the perspective marker hidden in slot zero; the tagged
/// union makes the perspective flip a total function instead of a
/// string compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionParam {
    Side(Side),
    Flag(bool),
    Number(f64),
    Text(String),
    Json(serde_json::Value),
}

impl ActionParam {
    fn flipped(&self) -> ActionParam {
        match self {
            ActionParam::Side(side) => ActionParam::Side(side.flipped()),
            other => other.clone(),
        }
    }
}

/// One applied game action, as recorded by the performing peer
///
/// Records are immutable: logs only append them, and prune or replace
/// wholesale on reset or resync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Which side performed the action, from the recorder's viewpoint
    #[serde(rename = "user")]
    pub side: Side,
    /// Action discriminant
    #[serde(rename = "action")]
    pub kind: ActionKind,
    /// Action parameters; `Side` parameters are perspective-relative
    pub parameters: Vec<ActionParam>,
    /// Whether the action was broadcast when performed
    pub emit: bool,
}

impl ActionRecord {
    pub fn new(side: Side, kind: ActionKind, parameters: Vec<ActionParam>) -> Self {
        Self {
            side,
            kind,
            parameters,
            emit: true,
        }
    }

    /// Reinterpret the record from the other peer's perspective:
    /// flips the acting side and every `Side` parameter.
    pub fn flipped(&self) -> ActionRecord {
        ActionRecord {
            side: self.side.flipped(),
            kind: self.kind.clone(),
            parameters: self.parameters.iter().map(ActionParam::flipped).collect(),
            emit: self.emit,
        }
    }
}
