#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for trivia room client integration tests.
//!
//! Provides a scriptable [`MockGameApi`] plus fixture builders for games,
//! participants, and questions. Endpoint scripts are consumed in order and
//! the final entry is sticky: once a queue is down to one item, every further
//! call replays it. That makes "status goes waiting → starting and stays
//! there" a two-line script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trivia_room_client::error::{Result, TriviaError};
use trivia_room_client::protocol::{
    AnswerBody, CreateGameBody, Difficulty, FinishedPlayer, FinishedPlayers, Game, GameEntry,
    GameId, GameResults, GameStatus, GuestBody, JoinGuestBody, LeaderboardEntry, LeaveBody,
    Participant, Progress, Question, QuestionId, RegisterFinishedBody, StartGuestBody,
};
use trivia_room_client::GameApi;

// ── Call log ────────────────────────────────────────────────────────

/// One recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateGame,
    ListGames,
    FetchGame,
    JoinGuest,
    StartGuest,
    FetchProgress,
    SubmitAnswer {
        question: QuestionId,
        selected: String,
    },
    SetFinished,
    RegisterFinished,
    FinishedPlayers,
    ForceComplete,
    FetchResults,
    Leave {
        reason: String,
    },
    CleanupExpired,
}

// ── Scripted responses ──────────────────────────────────────────────

/// A scripted endpoint response. Errors are stored as messages so scripts
/// stay cloneable.
#[derive(Debug, Clone)]
pub enum Scripted<T: Clone> {
    Ok(T),
    Fail(String),
}

impl<T: Clone> Scripted<T> {
    fn into_result(self) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Fail(message) => Err(TriviaError::Http(message)),
        }
    }
}

type Script<T> = Mutex<VecDeque<Scripted<T>>>;

fn sticky_pop<T: Clone>(script: &Script<T>) -> Scripted<T> {
    let mut queue = script.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue
            .front()
            .cloned()
            .unwrap_or_else(|| Scripted::Fail("unscripted call".into()))
    }
}

fn push<T: Clone>(script: &Script<T>, item: Scripted<T>) {
    script.lock().unwrap().push_back(item);
}

// ── MockGameApi ─────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    create: Script<GameEntry>,
    join: Script<GameEntry>,
    games: Script<Game>,
    progress: Script<Progress>,
    finished: Script<FinishedPlayers>,
    results: Script<GameResults>,
    open_games: Script<Vec<Game>>,
    calls: Mutex<Vec<Call>>,
}

/// A scriptable in-memory [`GameApi`] that records every call.
///
/// Clone the mock before handing it to `TriviaClient::start`; the clone
/// shares scripts and the call log.
#[derive(Clone, Default)]
pub struct MockGameApi {
    inner: Arc<Inner>,
}

impl MockGameApi {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scripting ───────────────────────────────────────────────────

    pub fn push_create(&self, entry: GameEntry) -> &Self {
        push(&self.inner.create, Scripted::Ok(entry));
        self
    }

    pub fn fail_create(&self, message: &str) -> &Self {
        push(&self.inner.create, Scripted::Fail(message.into()));
        self
    }

    pub fn push_join(&self, entry: GameEntry) -> &Self {
        push(&self.inner.join, Scripted::Ok(entry));
        self
    }

    pub fn fail_join(&self, message: &str) -> &Self {
        push(&self.inner.join, Scripted::Fail(message.into()));
        self
    }

    pub fn push_game(&self, game: Game) -> &Self {
        push(&self.inner.games, Scripted::Ok(game));
        self
    }

    pub fn fail_game(&self, message: &str) -> &Self {
        push(&self.inner.games, Scripted::Fail(message.into()));
        self
    }

    pub fn push_progress(&self, generated: u32, total: u32, is_ready: bool) -> &Self {
        push(
            &self.inner.progress,
            Scripted::Ok(Progress {
                generated,
                total,
                is_ready,
            }),
        );
        self
    }

    /// Script a finished-players roster of `count` guests (ids `0..count`).
    pub fn push_finished_count(&self, count: usize) -> &Self {
        let players = (0..count)
            .map(|i| FinishedPlayer {
                guest_id: i as i64,
                player_name: format!("player-{i}"),
            })
            .collect();
        push(&self.inner.finished, Scripted::Ok(FinishedPlayers { players }));
        self
    }

    pub fn push_results(&self, entries: Vec<LeaderboardEntry>) -> &Self {
        push(&self.inner.results, Scripted::Ok(GameResults { entries }));
        self
    }

    pub fn fail_results(&self, message: &str) -> &Self {
        push(&self.inner.results, Scripted::Fail(message.into()));
        self
    }

    pub fn push_open_games(&self, games: Vec<Game>) -> &Self {
        push(&self.inner.open_games, Scripted::Ok(games));
        self
    }

    // ── Call inspection ─────────────────────────────────────────────

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, wanted: impl Fn(&Call) -> bool) -> usize {
        self.inner.calls.lock().unwrap().iter().filter(|c| wanted(c)).count()
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GameApi for MockGameApi {
    async fn create_game(&self, _body: CreateGameBody) -> Result<GameEntry> {
        self.record(Call::CreateGame);
        sticky_pop(&self.inner.create).into_result()
    }

    async fn list_waiting_games(&self) -> Result<Vec<Game>> {
        self.record(Call::ListGames);
        sticky_pop(&self.inner.open_games).into_result()
    }

    async fn fetch_game(&self, _id: GameId) -> Result<Game> {
        self.record(Call::FetchGame);
        sticky_pop(&self.inner.games).into_result()
    }

    async fn join_guest(&self, _id: GameId, _body: JoinGuestBody) -> Result<GameEntry> {
        self.record(Call::JoinGuest);
        sticky_pop(&self.inner.join).into_result()
    }

    async fn start_guest(&self, _id: GameId, _body: StartGuestBody) -> Result<()> {
        self.record(Call::StartGuest);
        Ok(())
    }

    async fn fetch_progress(&self, _id: GameId) -> Result<Progress> {
        self.record(Call::FetchProgress);
        sticky_pop(&self.inner.progress).into_result()
    }

    async fn submit_answer(
        &self,
        _id: GameId,
        question: QuestionId,
        body: AnswerBody,
    ) -> Result<()> {
        self.record(Call::SubmitAnswer {
            question,
            selected: body.selected_answer,
        });
        Ok(())
    }

    async fn set_finished(&self, _id: GameId, _body: GuestBody) -> Result<()> {
        self.record(Call::SetFinished);
        Ok(())
    }

    async fn register_finished(&self, _id: GameId, _body: RegisterFinishedBody) -> Result<()> {
        self.record(Call::RegisterFinished);
        Ok(())
    }

    async fn finished_players(&self, _id: GameId) -> Result<FinishedPlayers> {
        self.record(Call::FinishedPlayers);
        sticky_pop(&self.inner.finished).into_result()
    }

    async fn force_complete(&self, _id: GameId, _body: GuestBody) -> Result<()> {
        self.record(Call::ForceComplete);
        Ok(())
    }

    async fn fetch_results(&self, _id: GameId) -> Result<GameResults> {
        self.record(Call::FetchResults);
        sticky_pop(&self.inner.results).into_result()
    }

    async fn leave(&self, _id: GameId, body: LeaveBody) -> Result<()> {
        self.record(Call::Leave {
            reason: body.reason,
        });
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<()> {
        self.record(Call::CleanupExpired);
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn participant(guest_id: i64, name: &str, score: u32) -> Participant {
    Participant {
        guest_id,
        player_name: name.into(),
        is_creator: guest_id == 0,
        score,
        correct_answers: 0,
        finished_questions: None,
        finished_all_questions: false,
    }
}

pub fn question(id: QuestionId, difficulty: Difficulty, correct: &str, wrong: &str) -> Question {
    Question {
        id,
        text: format!("question {id}"),
        options: vec![correct.into(), wrong.into()],
        correct_answer: correct.into(),
        difficulty,
        points: None,
    }
}

/// One-question room with a single creator participant named Alice.
pub fn game(id: GameId, status: GameStatus) -> Game {
    Game {
        id,
        name: "test-room".into(),
        status,
        difficulty: Difficulty::Easy,
        questions_per_game: 1,
        max_players: 2,
        time_per_question: None,
        participants: vec![participant(0, "Alice", 0)],
        questions: None,
    }
}

pub fn with_participants(mut game: Game, participants: Vec<Participant>) -> Game {
    game.participants = participants;
    game
}

pub fn with_questions(mut game: Game, questions: Vec<Question>) -> Game {
    game.questions = Some(questions);
    game
}

pub fn entry(game: Game, guest_id: i64, name: &str) -> GameEntry {
    GameEntry {
        participant: participant(guest_id, name, 0),
        game,
    }
}
