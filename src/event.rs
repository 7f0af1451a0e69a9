//! Typed events emitted by the client.
//!
//! Events arrive on the bounded receiver returned from
//! [`TriviaClient::start`](crate::client::TriviaClient::start), in the order
//! the session loop produced them. When the consumer falls behind, events are
//! dropped with a warning rather than blocking the session loop — except
//! [`SessionClosed`](TriviaEvent::SessionClosed), which is always the last
//! event and is always delivered.

use crate::protocol::{Game, GameEntry, LeaderboardEntry, Question};

/// Events emitted by a running [`TriviaClient`](crate::client::TriviaClient)
/// session.
#[derive(Debug, Clone)]
pub enum TriviaEvent {
    /// Response to a list-open-games command.
    OpenGames { games: Vec<Game> },

    /// A room was created and this client entered it as the creator
    /// (boxed to reduce enum size).
    GameCreated(Box<GameEntry>),

    /// This client joined an existing room as a guest
    /// (boxed to reduce enum size).
    GameJoined(Box<GameEntry>),

    /// Fresh room snapshot while waiting for players: status and the current
    /// participant list (boxed to reduce enum size).
    RoomUpdated(Box<Game>),

    /// Question-generation progress while the room is loading.
    LoadingProgress { generated: u32, total: u32 },

    /// The question set is generated and fetched; the countdown follows.
    QuestionsReady { count: usize },

    /// Pre-round countdown tick. `seconds_left` counts down to 1.
    CountdownTick { seconds_left: u32 },

    /// A question is on screen and its timer is running.
    QuestionPresented {
        /// Zero-based position in the round.
        index: usize,
        /// Total questions in the round.
        total: usize,
        question: Question,
        time_limit_secs: f64,
    },

    /// Once-per-second question timer tick.
    TimerTick { index: usize, remaining_secs: f64 },

    /// An answer was locked (or the timer expired) and scored locally.
    AnswerScored {
        index: usize,
        /// The option the player locked, or `None` when the timer expired.
        selected: Option<String>,
        correct: bool,
        /// Points awarded for this question (base + time bonus, or zero).
        awarded: u32,
        /// Revealed correct answer.
        correct_answer: String,
        /// Local running total after this question.
        total_score: u32,
    },

    /// Own round finished; waiting for the remaining participants.
    WaitingForPlayers { finished: usize, total: usize },

    /// Final leaderboard. Emitted exactly once per round, even if every
    /// network path to the results failed (a local single-row leaderboard is
    /// the last resort).
    GameFinished {
        entries: Vec<LeaderboardEntry>,
        /// One-based rank of this client, when its row could be identified.
        your_rank: Option<usize>,
        your_entry: Option<LeaderboardEntry>,
    },

    /// The server cancelled the room. Always routes the session back to the
    /// lobby; wins over every other outcome a poll can observe.
    GameCancelled { message: String },

    /// This client left the room voluntarily.
    LeftGame,

    /// A non-fatal error: failed setup call, lapsed poll, rejected command.
    Error { message: String },

    /// The session loop exited. Always the final event.
    SessionClosed { reason: Option<String> },
}
