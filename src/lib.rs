//! # Trivia Room Client
//!
//! Backend-agnostic Rust client for a multiplayer trivia game-room API.
//!
//! This crate drives the full lifecycle of a trivia session against a
//! server-authoritative game room: create or join a room, wait for players,
//! watch question generation, run the countdown and per-question timers,
//! score answers, wait for the other participants, and assemble the final
//! leaderboard. The server is observed by polling; every polling phase has a
//! hard wall-clock exit, and a server-reported cancellation always wins.
//!
//! ## Features
//!
//! - **Backend-agnostic** — implement the [`GameApi`] trait for any backend
//! - **HTTP built-in** — default `api-http` feature provides [`HttpGameApi`]
//! - **Event-driven** — receive typed [`TriviaEvent`]s via a channel
//! - **Deterministic timers** — three named timer slots with one cleanup
//!   path, so a stale poll can never re-enter a finished phase
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let api = HttpGameApi::new("https://example.org/api")?;
//! let (client, mut events) = TriviaClient::start(api, TriviaConfig::new());
//!
//! client.create_game(CreateGameParams::new("friday-night", "Alice").with_solo(true))?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TriviaEvent::GameFinished { entries, .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod api;
pub mod apis;
pub mod client;
pub mod error;
pub mod event;
pub mod poll;
pub mod protocol;
pub mod scoring;
pub mod state;
pub mod timer;

// Re-export primary types for ergonomic imports.
pub use api::GameApi;
pub use client::{CreateGameParams, TriviaClient, TriviaConfig};
pub use error::TriviaError;
pub use event::TriviaEvent;
pub use protocol::{Difficulty, GameStatus};
pub use state::Phase;

#[cfg(feature = "api-http")]
pub use apis::http::HttpGameApi;
