//! # Solo Round Demo
//!
//! Plays one complete solo trivia round against a live game server:
//!
//! 1. Create a solo room
//! 2. Watch question generation progress and the countdown
//! 3. Answer every question (always the first option — this demo is not
//!    very good at trivia)
//! 4. Print the final leaderboard
//!
//! ## Running
//!
//! ```sh
//! # Start a game server on localhost:4000, then:
//! cargo run --example solo_round
//!
//! # Override the server URL or player name:
//! TRIVIA_API_URL=https://my-server/api TRIVIA_PLAYER=Ruth cargo run --example solo_round
//! ```

use trivia_room_client::{
    CreateGameParams, Difficulty, HttpGameApi, TriviaClient, TriviaConfig, TriviaEvent,
};

/// Default API base URL when `TRIVIA_API_URL` is not set.
const DEFAULT_URL: &str = "http://localhost:4000/api";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("TRIVIA_API_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let player = std::env::var("TRIVIA_PLAYER").unwrap_or_else(|_| "RustPlayer".to_string());
    tracing::info!("Playing against {url} as {player}");

    // ── Start ───────────────────────────────────────────────────────
    let api = HttpGameApi::new(&url)?;
    let (mut client, mut events) = TriviaClient::start(api, TriviaConfig::new());

    client.create_game(
        CreateGameParams::new(format!("{player}'s solo round"), player)
            .with_difficulty(Difficulty::Medium)
            .with_questions_per_game(5)
            .with_solo(true),
    )?;

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    TriviaEvent::GameCreated(entry) => {
                        tracing::info!("Created solo game {}", entry.game.id);
                    }

                    TriviaEvent::LoadingProgress { generated, total } => {
                        tracing::info!("Generating questions… {generated}/{total}");
                    }

                    TriviaEvent::CountdownTick { seconds_left } => {
                        tracing::info!("Starting in {seconds_left}…");
                    }

                    TriviaEvent::QuestionPresented { index, total, question, time_limit_secs } => {
                        tracing::info!(
                            "Question {}/{total} ({time_limit_secs}s): {}",
                            index + 1,
                            question.text
                        );
                        for (i, option) in question.options.iter().enumerate() {
                            tracing::info!("  [{i}] {option}");
                        }
                        // Lock the first option straight away for the full
                        // time bonus. Accuracy not guaranteed.
                        client.select_answer(0)?;
                    }

                    TriviaEvent::AnswerScored { correct, awarded, correct_answer, total_score, .. } => {
                        if correct {
                            tracing::info!("Correct! +{awarded} points (total {total_score})");
                        } else {
                            tracing::info!(
                                "Wrong — the answer was {correct_answer:?} (total {total_score})"
                            );
                        }
                    }

                    TriviaEvent::GameFinished { entries, your_rank, .. } => {
                        tracing::info!("Round over!");
                        for (i, row) in entries.iter().enumerate() {
                            tracing::info!(
                                "  #{} {} — {} pts ({} correct)",
                                i + 1,
                                row.player_name,
                                row.score,
                                row.correct_answers
                            );
                        }
                        if let Some(rank) = your_rank {
                            tracing::info!("You finished #{rank}");
                        }
                        break;
                    }

                    TriviaEvent::GameCancelled { message } => {
                        tracing::warn!("Cancelled: {message}");
                        break;
                    }

                    TriviaEvent::Error { message } => {
                        tracing::error!("Error: {message}");
                    }

                    TriviaEvent::SessionClosed { reason } => {
                        tracing::info!("Session closed: {}", reason.as_deref().unwrap_or("unknown"));
                        break;
                    }

                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, leaving…");
                let _ = client.leave_game("demo interrupted");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Client shut down. Goodbye!");
    Ok(())
}
