//! Game state snapshots.
//!
//! One [`GameState`] is the complete, versioned description of a game:
//! who is playing, what they hold, the piles, and whose turn it is. The
//! server owns exactly one authoritative instance per game; clients hold
//! read copies reconstructed from full-state or diff messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StateError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over the wire string (`"P1"`), so a player id can't be passed
/// where a game id is expected. `#[serde(transparent)]` keeps the JSON
/// form a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a player id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A unique identifier for a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    /// Creates a game id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A stable identifier for a card.
///
/// This is what the diff engine keys on when hands and piles change, so
/// it must never be reused within a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    /// Creates a card id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// French-deck suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    /// All four suits, in deck-construction order.
    pub const ALL: [Suit; 4] =
        [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

/// A single playing card with a stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Stable id (`"c0"`..`"c51"` for a standard deck).
    pub id: CardId,
    /// Rank 1 (ace) through 13 (king).
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    /// Builds an unshuffled standard 52-card deck with ids `c0`..`c51`.
    pub fn standard_deck() -> Vec<Card> {
        let mut deck = Vec::with_capacity(52);
        for (s, suit) in Suit::ALL.iter().enumerate() {
            for rank in 1..=13u8 {
                deck.push(Card {
                    id: CardId::new(format!("c{}", s * 13 + rank as usize - 1)),
                    rank,
                    suit: *suit,
                });
            }
        }
        deck
    }
}

// ---------------------------------------------------------------------------
// Phase state machine
// ---------------------------------------------------------------------------

/// The lifecycle phase of a game.
///
/// Transitions are strictly ordered:
///
/// ```text
/// WaitingForPlayers -> InProgress -> Finished
/// ```
///
/// Joining is only legal while waiting; playing, drawing, and folding
/// only while in progress. A finished game accepts nothing and is reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    WaitingForPlayers,
    InProgress,
    Finished,
}

impl GamePhase {
    /// Returns `true` if the game is accepting new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::WaitingForPlayers)
    }

    /// Returns `true` if the game is actively being played.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Attempts to transition to the next phase.
    ///
    /// Returns `Some(next)` if a forward transition exists, `None` once
    /// the game has finished.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingForPlayers => Some(Self::InProgress),
            Self::InProgress => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "waiting_for_players"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One player's slice of the game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub hand: Vec<Card>,
    pub score: u32,
    pub folded: bool,
}

impl PlayerState {
    /// Creates a player with an empty hand.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            hand: Vec::new(),
            score: 0,
            folded: false,
        }
    }

    /// Returns `true` if the player's hand contains the given card.
    pub fn holds(&self, card_id: &CardId) -> bool {
        self.hand.iter().any(|c| &c.id == card_id)
    }
}

/// The full, versioned snapshot of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    /// Increments by exactly one per committed mutation.
    pub version: u64,
    pub phase: GamePhase,
    /// Seat order is join order; `turn` indexes into this list.
    pub players: Vec<PlayerState>,
    pub draw_pile: Vec<Card>,
    pub discard_pile: Vec<Card>,
    pub turn: usize,
}

impl GameState {
    /// Creates an empty game waiting for players.
    pub fn new(game_id: GameId) -> Self {
        Self {
            game_id,
            version: 0,
            phase: GamePhase::WaitingForPlayers,
            players: Vec::new(),
            draw_pile: Vec::new(),
            discard_pile: Vec::new(),
            turn: 0,
        }
    }

    /// Looks up a player by id.
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Looks up a player by id, mutably.
    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// Returns `true` if the player has joined this game.
    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// The player whose turn it currently is, if the game has seats.
    pub fn current_player(&self) -> Option<&PlayerState> {
        self.players.get(self.turn)
    }

    /// Returns `true` if it is this player's turn.
    pub fn is_turn(&self, id: &PlayerId) -> bool {
        self.current_player().is_some_and(|p| &p.id == id)
    }

    /// Number of players who have not folded.
    pub fn active_players(&self) -> usize {
        self.players.iter().filter(|p| !p.folded).count()
    }

    /// Advances the turn to the next unfolded player, wrapping around.
    /// Leaves the turn untouched if nobody is left unfolded.
    pub fn advance_turn(&mut self) {
        if self.active_players() == 0 {
            return;
        }
        loop {
            self.turn = (self.turn + 1) % self.players.len();
            if !self.players[self.turn].folded {
                break;
            }
        }
    }

    /// Records one committed mutation.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Serializes the snapshot into a JSON tree for diffing.
    pub fn to_value(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuilds a snapshot from a JSON tree.
    pub fn from_value(value: serde_json::Value) -> Result<Self, StateError> {
        Ok(serde_json::from_value(value)?)
    }
}
