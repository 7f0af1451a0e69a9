//! # Multiplayer Lobby Demo
//!
//! Hosts a multiplayer trivia room and plays one round:
//!
//! 1. Create a room and print its share link
//! 2. Poll the lobby until a second player joins
//! 3. Start the round, answer every question, wait for the other players
//! 4. Print the final leaderboard
//!
//! Join from elsewhere with `?join={id}` on the game page, or with a second
//! client using `TriviaClient::join_game`.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example lobby
//!
//! TRIVIA_API_URL=https://my-server/api TRIVIA_PLAYER=Deborah cargo run --example lobby
//! ```

use trivia_room_client::protocol::share_link;
use trivia_room_client::{
    CreateGameParams, Difficulty, HttpGameApi, TriviaClient, TriviaConfig, TriviaEvent,
};

const DEFAULT_URL: &str = "http://localhost:4000/api";
const DEFAULT_PAGE: &str = "http://localhost:4000/trivia";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("TRIVIA_API_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let page = std::env::var("TRIVIA_PAGE_URL").unwrap_or_else(|_| DEFAULT_PAGE.to_string());
    let player = std::env::var("TRIVIA_PLAYER").unwrap_or_else(|_| "RustHost".to_string());

    let api = HttpGameApi::new(&url)?;
    let (mut client, mut events) = TriviaClient::start(api, TriviaConfig::new());

    client.create_game(
        CreateGameParams::new("rust-lobby", player)
            .with_difficulty(Difficulty::Easy)
            .with_max_players(4)
            .with_questions_per_game(3),
    )?;

    let mut started = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };

                match event {
                    TriviaEvent::GameCreated(entry) => {
                        tracing::info!(
                            "Room {} is open — share this link: {}",
                            entry.game.id,
                            share_link(&page, entry.game.id)
                        );
                    }

                    TriviaEvent::RoomUpdated(game) => {
                        tracing::info!(
                            "{} player(s) in the room",
                            game.participants.len()
                        );
                        // Kick the round off once somebody else shows up.
                        if !started && game.participants.len() >= 2 {
                            started = true;
                            tracing::info!("Second player arrived — starting!");
                            client.start_game()?;
                        }
                    }

                    TriviaEvent::LoadingProgress { generated, total } => {
                        tracing::info!("Generating questions… {generated}/{total}");
                    }

                    TriviaEvent::QuestionPresented { index, total, question, .. } => {
                        tracing::info!("Question {}/{total}: {}", index + 1, question.text);
                        client.select_answer(0)?;
                    }

                    TriviaEvent::AnswerScored { correct, total_score, .. } => {
                        tracing::info!("Scored (correct={correct}), total {total_score}");
                    }

                    TriviaEvent::WaitingForPlayers { finished, total } => {
                        tracing::info!("Waiting for the others… {finished}/{total} done");
                    }

                    TriviaEvent::GameFinished { entries, your_rank, .. } => {
                        for (i, row) in entries.iter().enumerate() {
                            tracing::info!("  #{} {} — {} pts", i + 1, row.player_name, row.score);
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

                    TriviaEvent::SessionClosed { .. } => break,

                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, leaving room…");
                let _ = client.leave_game("host interrupted");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
