//! Backend abstraction for the trivia game-room API.
//!
//! The [`GameApi`] trait covers every server operation the client drives. The
//! session loop only ever talks to the server through this trait, which keeps
//! the state machine independent of any HTTP stack and lets tests script
//! server behavior with an in-memory implementation.
//!
//! Connection setup is intentionally NOT part of this trait — backends have
//! fundamentally different construction parameters (base URL and TLS options
//! for HTTP, nothing at all for an in-memory mock). Construct a backend
//! externally, then pass it to `TriviaClient::start`.
//!
//! # Implementing a custom backend
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use trivia_room_client::api::GameApi;
//! use trivia_room_client::error::Result;
//! use trivia_room_client::protocol::*;
//!
//! struct MyBackend { /* ... */ }
//!
//! #[async_trait]
//! impl GameApi for MyBackend {
//!     async fn create_game(&self, body: CreateGameBody) -> Result<GameEntry> {
//!         todo!()
//!     }
//!     # async fn list_waiting_games(&self) -> Result<Vec<Game>> { todo!() }
//!     # async fn fetch_game(&self, id: GameId) -> Result<Game> { todo!() }
//!     # async fn join_guest(&self, id: GameId, body: JoinGuestBody) -> Result<GameEntry> { todo!() }
//!     # async fn start_guest(&self, id: GameId, body: StartGuestBody) -> Result<()> { todo!() }
//!     # async fn fetch_progress(&self, id: GameId) -> Result<Progress> { todo!() }
//!     # async fn submit_answer(&self, id: GameId, q: QuestionId, body: AnswerBody) -> Result<()> { todo!() }
//!     # async fn set_finished(&self, id: GameId, body: GuestBody) -> Result<()> { todo!() }
//!     # async fn register_finished(&self, id: GameId, body: RegisterFinishedBody) -> Result<()> { todo!() }
//!     # async fn finished_players(&self, id: GameId) -> Result<FinishedPlayers> { todo!() }
//!     # async fn force_complete(&self, id: GameId, body: GuestBody) -> Result<()> { todo!() }
//!     # async fn fetch_results(&self, id: GameId) -> Result<GameResults> { todo!() }
//!     # async fn leave(&self, id: GameId, body: LeaveBody) -> Result<()> { todo!() }
//!     # async fn cleanup_expired(&self) -> Result<()> { todo!() }
//! }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{
    AnswerBody, CreateGameBody, FinishedPlayers, Game, GameEntry, GameId, GameResults, GuestBody,
    JoinGuestBody, LeaveBody, Progress, QuestionId, RegisterFinishedBody, StartGuestBody,
};

/// Server operations of the trivia game-room API.
///
/// # Object Safety
///
/// This trait is object-safe; the client stores backends as
/// `Arc<dyn GameApi>` so spawned pollers can share one instance.
///
/// # Cancel Safety
///
/// Methods are awaited inside polling tasks that may be aborted at any time
/// (phase changes, cleanup, hard timeouts). Implementations must tolerate a
/// request future being dropped mid-flight.
#[async_trait]
pub trait GameApi: Send + Sync + 'static {
    /// Create a game room (solo or multiplayer).
    async fn create_game(&self, body: CreateGameBody) -> Result<GameEntry>;

    /// List rooms currently accepting players.
    async fn list_waiting_games(&self) -> Result<Vec<Game>>;

    /// Fetch a room's current record: status, participants, and the question
    /// set once generated.
    async fn fetch_game(&self, id: GameId) -> Result<Game>;

    /// Join a room as a guest.
    async fn join_guest(&self, id: GameId, body: JoinGuestBody) -> Result<GameEntry>;

    /// Start a room (creator only).
    async fn start_guest(&self, id: GameId, body: StartGuestBody) -> Result<()>;

    /// Fetch question-generation progress for a starting room.
    async fn fetch_progress(&self, id: GameId) -> Result<Progress>;

    /// Submit an answer for one question.
    async fn submit_answer(&self, id: GameId, question: QuestionId, body: AnswerBody)
        -> Result<()>;

    /// Mark this guest as finished with their round.
    async fn set_finished(&self, id: GameId, body: GuestBody) -> Result<()>;

    /// Register this guest in the room's finished-players set.
    async fn register_finished(&self, id: GameId, body: RegisterFinishedBody) -> Result<()>;

    /// Fetch the roster of finished participants.
    async fn finished_players(&self, id: GameId) -> Result<FinishedPlayers>;

    /// Force the round to complete (used after the finish-wait ceiling).
    async fn force_complete(&self, id: GameId, body: GuestBody) -> Result<()>;

    /// Fetch the final leaderboard.
    async fn fetch_results(&self, id: GameId) -> Result<GameResults>;

    /// Leave or cancel a room.
    async fn leave(&self, id: GameId, body: LeaveBody) -> Result<()>;

    /// Ask the server to clean up stale rooms.
    async fn cleanup_expired(&self) -> Result<()>;
}
