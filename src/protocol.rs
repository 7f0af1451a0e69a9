//! Wire types for the trivia game-room API.
//!
//! Every type in this module matches the JSON the game server actually
//! produces and consumes. Two conventions coexist on the wire:
//!
//! - Server **records** (games, participants, questions, leaderboard rows)
//!   use `snake_case` field names.
//! - Request **bodies** use `camelCase` field names.
//!
//! The one deliberately lenient spot is [`Question::options`]: depending on
//! how a question was generated the server returns either a JSON array of
//! strings or a JSON-encoded string containing such an array. Both shapes are
//! normalized to `Vec<String>` here, at the boundary, so nothing downstream
//! ever branches on the payload shape.

use serde::{Deserialize, Deserializer, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Unique identifier for game rooms.
pub type GameId = i64;

/// Per-room guest identifier. The room creator is always `0`; joiners
/// receive sequential positive integers assigned by the server.
pub type GuestId = i64;

/// Unique identifier for questions.
pub type QuestionId = i64;

/// Reserved guest id for the room creator.
pub const CREATOR_GUEST_ID: GuestId = 0;

// ── Enums ───────────────────────────────────────────────────────────

/// Lifecycle status of a game room, as reported by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Room is open and accepting players.
    #[default]
    Waiting,
    /// The creator has started the room; questions are being generated.
    Starting,
    /// The round is underway.
    InProgress,
    /// The round finished normally.
    Completed,
    /// The room was cancelled (creator left, expired, …).
    Cancelled,
}

impl GameStatus {
    /// Returns `true` for the terminal `cancelled` status.
    ///
    /// Cancellation takes priority over every other observation a poll can
    /// make, so call sites check this first.
    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` while the room is still accepting players.
    pub fn is_waiting(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` once the room has left the waiting phase for good
    /// (started, running, or finished).
    pub fn has_started(self) -> bool {
        matches!(self, Self::Starting | Self::InProgress | Self::Completed)
    }
}

/// Question difficulty. Determines both the per-question time limit and the
/// score normalization base.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// Seconds a player gets to answer one question of this difficulty.
    pub fn time_limit_secs(self) -> f64 {
        match self {
            Self::Easy => 12.0,
            Self::Medium => 16.5,
            Self::Hard => 21.0,
            Self::Expert => 25.5,
        }
    }
}

// ── Records ─────────────────────────────────────────────────────────

/// A player's record within a room, keyed by `guest_id`.
///
/// Authoritative fields (`score`, `correct_answers`) are only ever written by
/// the server; the client mirrors them and never mutates them locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub guest_id: GuestId,
    pub player_name: String,
    #[serde(default)]
    pub is_creator: bool,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub correct_answers: u32,
    /// Number of questions this participant has finished, when the server
    /// reports it (used to detect a round that completed while this client
    /// was away).
    #[serde(default)]
    pub finished_questions: Option<u32>,
    #[serde(default)]
    pub finished_all_questions: bool,
}

/// A single trivia question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(deserialize_with = "options_from_wire")]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub difficulty: Difficulty,
    /// Server-declared base points. The client computes its own normalized
    /// points per question and does not use this field for scoring.
    #[serde(default)]
    pub points: Option<u32>,
}

/// A game-room record. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub status: GameStatus,
    pub difficulty: Difficulty,
    pub questions_per_game: u32,
    pub max_players: u32,
    #[serde(default)]
    pub time_per_question: Option<f64>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Present once question generation has completed.
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
}

/// Question-generation progress for a starting room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub generated: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default, alias = "isReady")]
    pub is_ready: bool,
}

/// The server's answer to create/join calls: the room plus this client's
/// participant record.
#[derive(Debug, Clone, Deserialize)]
pub struct GameEntry {
    pub game: Game,
    pub participant: Participant,
}

/// One row of the final leaderboard.
///
/// `guest_id` is optional because the results endpoint does not always
/// include it; self-identification falls back to name matching when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub guest_id: Option<GuestId>,
    pub player_name: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub correct_answers: u32,
}

/// Final leaderboard returned by the results endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameResults {
    #[serde(default, alias = "results", alias = "leaderboard")]
    pub entries: Vec<LeaderboardEntry>,
}

/// A participant that has been registered as finished.
#[derive(Debug, Clone, Deserialize)]
pub struct FinishedPlayer {
    pub guest_id: GuestId,
    #[serde(default)]
    pub player_name: String,
}

/// Roster returned by the finished-players endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinishedPlayers {
    #[serde(default)]
    pub players: Vec<FinishedPlayer>,
}

impl FinishedPlayers {
    /// Number of participants registered as finished.
    pub fn count(&self) -> usize {
        self.players.len()
    }
}

// ── Request bodies ──────────────────────────────────────────────────

/// Body for `POST /bible-games/create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameBody {
    pub name: String,
    pub difficulty: Difficulty,
    pub max_players: u32,
    pub questions_per_game: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_per_question: Option<f64>,
    pub player_name: String,
    pub is_solo: bool,
}

/// Body for `POST /bible-games/{id}/join-guest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGuestBody {
    pub player_name: String,
}

/// Body for `POST /bible-games/{id}/start-guest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGuestBody {
    pub guest_id: GuestId,
}

/// Body for `POST /bible-games/{id}/questions/{qid}/answer-guest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBody {
    pub selected_answer: String,
    /// Seconds elapsed between question presentation and the answer lock.
    pub time_taken: f64,
    pub guest_id: GuestId,
}

/// Body for `POST /bible-games/{id}/set-finished` and
/// `POST /bible-games/{id}/force-complete`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestBody {
    pub guest_id: GuestId,
}

/// Body for `POST /bible-games/{id}/register-finished`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFinishedBody {
    pub guest_id: GuestId,
    pub player_name: String,
}

/// Body for `POST /bible-games/{id}/leave`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBody {
    pub guest_id: GuestId,
    pub reason: String,
}

// ── Share links ─────────────────────────────────────────────────────

/// Builds a join link of the form `{page}?join={game_id}`.
///
/// `page` is the origin plus pathname of the page hosting the game UI.
pub fn share_link(page: &str, game_id: GameId) -> String {
    format!("{page}?join={game_id}")
}

/// Extracts the game id from a `?join={gameId}` share link, if present.
///
/// ```
/// use trivia_room_client::protocol::parse_join_link;
///
/// assert_eq!(parse_join_link("https://example.org/play?join=42"), Some(42));
/// assert_eq!(parse_join_link("https://example.org/play"), None);
/// ```
pub fn parse_join_link(url: &str) -> Option<GameId> {
    let (_, query) = url.split_once('?')?;
    // Ignore any fragment trailing the query string.
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "join")
        .and_then(|(_, value)| value.parse::<GameId>().ok())
}

// ── Deserialization helpers ─────────────────────────────────────────

/// Accepts `options` as either a JSON array of strings or a JSON-encoded
/// string containing one, and normalizes to `Vec<String>`.
fn options_from_wire<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Encoded(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::List(options) => Ok(options),
        Raw::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
    }
}
