//! Async client for the trivia game-room API.
//!
//! [`TriviaClient`] is a thin handle that communicates with a background
//! session loop task via an unbounded MPSC channel. Events are emitted on a
//! bounded channel ([`tokio::sync::mpsc::Receiver<TriviaEvent>`]) returned
//! from [`TriviaClient::start`].
//!
//! The session loop owns the whole game lifecycle: room waiting, question
//! generation, the countdown, the per-question timer, the finish wait, and
//! results assembly. Server state is observed by polling; every polling phase
//! has both a success exit and an unconditional wall-clock exit, and a
//! server-reported `cancelled` status beats every other outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! let api = HttpGameApi::new("https://example.org/api")?;
//! let (client, mut events) = TriviaClient::start(api, TriviaConfig::new());
//!
//! client.create_game(
//!     CreateGameParams::new("friday-night", "Alice")
//!         .with_difficulty(Difficulty::Medium)
//!         .with_max_players(4),
//! )?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TriviaEvent::QuestionPresented { index, .. } => { /* … */ }
//!         TriviaEvent::GameFinished { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::api::GameApi;
use crate::error::{Result, TriviaError};
use crate::event::TriviaEvent;
use crate::poll::{poll_until, with_retries, PollOutcome};
use crate::protocol::{
    AnswerBody, CreateGameBody, Difficulty, Game, GameId, GuestBody, GuestId, JoinGuestBody,
    LeaveBody, Progress, Question, RegisterFinishedBody, StartGuestBody,
};
use crate::scoring;
use crate::state::{
    everyone_finished, find_self_entry, local_leaderboard, rank_participants, GameMode, LocalUser,
    Phase, SessionState,
};
use crate::timer::{TimerKind, Timers};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`TriviaClient`] session.
///
/// All fields have defaults matching the live service's polling contract; the
/// builders exist mainly so tests and unusual deployments can tighten or
/// relax the cadence.
///
/// # Example
///
/// ```
/// use trivia_room_client::client::TriviaConfig;
/// use std::time::Duration;
///
/// let config = TriviaConfig::new()
///     .with_event_channel_capacity(512)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct TriviaConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up, events are dropped (with a warning
    /// logged) to avoid blocking the session loop. The `SessionClosed` event
    /// is always delivered regardless of capacity.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown before the session task is aborted.
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Interval of the room-status poll while waiting for players.
    /// Defaults to **500 ms**.
    pub room_poll_interval: Duration,
    /// Wall-clock cap on room-status polling. Defaults to **30 s**.
    pub room_wait_timeout: Duration,
    /// Interval of the question-generation progress poll.
    /// Defaults to **1 s**.
    pub progress_poll_interval: Duration,
    /// Wall-clock cap on the loading phase. Defaults to **5 min**.
    pub loading_timeout: Duration,
    /// Pause between the question set becoming ready and the countdown.
    /// Defaults to **1 s**.
    pub ready_delay: Duration,
    /// Length of the pre-round countdown, in whole seconds.
    /// Defaults to **3**.
    pub countdown_seconds: u32,
    /// How long correctness feedback stays up before the next question.
    /// Defaults to **2 s**.
    pub feedback_delay: Duration,
    /// Interval of the finished-players poll. Defaults to **1.5 s**.
    pub finished_poll_interval: Duration,
    /// Ceiling on waiting for other players, after which the round is
    /// force-completed. Defaults to **20 s**.
    pub finished_wait_timeout: Duration,
    /// Attempts for the set-finished / register-finished calls.
    /// Defaults to **3**.
    pub finish_retry_attempts: u32,
    /// Backoff between those attempts. Defaults to **1 s**.
    pub finish_retry_backoff: Duration,
}

impl TriviaConfig {
    /// Create a configuration with the default polling contract.
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            room_poll_interval: Duration::from_millis(500),
            room_wait_timeout: Duration::from_secs(30),
            progress_poll_interval: Duration::from_secs(1),
            loading_timeout: Duration::from_secs(300),
            ready_delay: Duration::from_secs(1),
            countdown_seconds: 3,
            feedback_delay: Duration::from_secs(2),
            finished_poll_interval: Duration::from_millis(1500),
            finished_wait_timeout: Duration::from_secs(20),
            finish_retry_attempts: 3,
            finish_retry_backoff: Duration::from_secs(1),
        }
    }

    /// Set the capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the room-status polling interval and wall-clock cap.
    #[must_use]
    pub fn with_room_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.room_poll_interval = interval;
        self.room_wait_timeout = timeout;
        self
    }

    /// Set the progress polling interval and the loading-phase cap.
    #[must_use]
    pub fn with_progress_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.progress_poll_interval = interval;
        self.loading_timeout = timeout;
        self
    }

    /// Set the finished-players polling interval and the finish-wait ceiling.
    #[must_use]
    pub fn with_finish_waiting(mut self, interval: Duration, timeout: Duration) -> Self {
        self.finished_poll_interval = interval;
        self.finished_wait_timeout = timeout;
        self
    }

    /// Set the pre-round countdown length in seconds.
    #[must_use]
    pub fn with_countdown_seconds(mut self, seconds: u32) -> Self {
        self.countdown_seconds = seconds;
        self
    }

    /// Set the correctness-feedback delay between questions.
    #[must_use]
    pub fn with_feedback_delay(mut self, delay: Duration) -> Self {
        self.feedback_delay = delay;
        self
    }
}

impl Default for TriviaConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── CreateGameParams ────────────────────────────────────────────────

/// Parameters for creating a game room.
///
/// Only `name` and `player_name` are required. A solo room skips the waiting
/// phase entirely and goes straight to question generation.
///
/// # Example
///
/// ```
/// use trivia_room_client::client::CreateGameParams;
/// use trivia_room_client::protocol::Difficulty;
///
/// let params = CreateGameParams::new("friday-night", "Alice")
///     .with_difficulty(Difficulty::Hard)
///     .with_max_players(4);
/// assert_eq!(params.max_players, 4);
/// ```
#[derive(Debug, Clone)]
pub struct CreateGameParams {
    /// Display name of the room.
    pub name: String,
    /// Display name of the creating player.
    pub player_name: String,
    /// Difficulty of the generated questions.
    pub difficulty: Difficulty,
    /// Maximum number of players allowed in the room.
    pub max_players: u32,
    /// Number of questions to generate for the round.
    pub questions_per_game: u32,
    /// Server-side per-question time override, in seconds.
    pub time_per_question: Option<f64>,
    /// `true` for a single-player room.
    pub solo: bool,
}

impl CreateGameParams {
    /// Create new room parameters with the required fields.
    pub fn new(name: impl Into<String>, player_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            player_name: player_name.into(),
            difficulty: Difficulty::Easy,
            max_players: 2,
            questions_per_game: 10,
            time_per_question: None,
            solo: false,
        }
    }

    /// Set the question difficulty.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the maximum number of players.
    #[must_use]
    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }

    /// Set the number of questions per round.
    #[must_use]
    pub fn with_questions_per_game(mut self, questions_per_game: u32) -> Self {
        self.questions_per_game = questions_per_game;
        self
    }

    /// Override the server-side per-question time, in seconds.
    #[must_use]
    pub fn with_time_per_question(mut self, seconds: f64) -> Self {
        self.time_per_question = Some(seconds);
        self
    }

    /// Mark the room as single-player.
    #[must_use]
    pub fn with_solo(mut self, solo: bool) -> Self {
        self.solo = solo;
        self
    }
}

// ── Commands and internal messages ──────────────────────────────────

/// Commands sent from the handle to the session loop.
#[derive(Debug)]
enum Command {
    CreateGame(CreateGameParams),
    ListGames,
    JoinGame { game_id: GameId, player_name: String },
    StartGame,
    SelectAnswer { index: usize },
    LeaveGame { reason: String },
    Reset,
    CleanupExpired,
}

/// Messages produced by spawned timer tasks for the session loop.
///
/// Every message carries the generation it was armed under; the loop drops
/// messages from earlier generations, so a poller that raced its own abort
/// can never re-enter a phase that has already been left.
#[derive(Debug)]
enum Internal {
    RoomSnapshot { generation: u64, game: Box<Game> },
    RoomPollLapsed { generation: u64 },
    LoadingSnapshot { generation: u64, game: Box<Game>, progress: Progress },
    LoadingLapsed { generation: u64 },
    Tick { generation: u64 },
    Advance { generation: u64 },
    FinishedSnapshot { generation: u64, finished: usize },
    FinishWaitLapsed { generation: u64 },
}

impl Internal {
    fn generation(&self) -> u64 {
        match self {
            Self::RoomSnapshot { generation, .. }
            | Self::RoomPollLapsed { generation }
            | Self::LoadingSnapshot { generation, .. }
            | Self::LoadingLapsed { generation }
            | Self::Tick { generation }
            | Self::Advance { generation }
            | Self::FinishedSnapshot { generation, .. }
            | Self::FinishWaitLapsed { generation } => *generation,
        }
    }
}

/// What the next `Advance` message should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdvanceTarget {
    None,
    Countdown,
    NextQuestion,
}

// ── Shared state ────────────────────────────────────────────────────

/// State shared between the client handle and the session loop.
struct SharedState {
    running: AtomicBool,
    score: AtomicU32,
    phase: Mutex<Phase>,
    game_id: Mutex<Option<GameId>>,
    guest_id: Mutex<Option<GuestId>>,
    session_id: Mutex<Uuid>,
}

impl SharedState {
    fn new(session_id: Uuid) -> Self {
        Self {
            running: AtomicBool::new(true),
            score: AtomicU32::new(0),
            phase: Mutex::new(Phase::Lobby),
            game_id: Mutex::new(None),
            guest_id: Mutex::new(None),
            session_id: Mutex::new(session_id),
        }
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for a trivia game-room session.
///
/// Created via [`TriviaClient::start`], which spawns the background session
/// loop and returns this handle together with an event receiver.
///
/// All command methods queue a message to the session loop and return
/// immediately once it is queued (no round-trip await); outcomes arrive as
/// [`TriviaEvent`]s.
pub struct TriviaClient {
    /// Sender half of the command channel to the session loop.
    cmd_tx: mpsc::UnboundedSender<Command>,
    /// Shared state updated by the session loop.
    shared: Arc<SharedState>,
    /// Handle to the background session loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the session loop to shut down gracefully.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
}

impl TriviaClient {
    /// Start the session loop and return a handle plus event receiver.
    ///
    /// # Arguments
    ///
    /// * `api` — A [`GameApi`] backend (HTTP in production, a mock in tests).
    /// * `config` — Session configuration; `TriviaConfig::new()` matches the
    ///   live service.
    ///
    /// # Returns
    ///
    /// A tuple of `(client_handle, event_receiver)`. The receiver yields
    /// [`TriviaEvent`]s until the client shuts down.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(api: impl GameApi, config: TriviaConfig) -> (Self, mpsc::Receiver<TriviaEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel::<Internal>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<TriviaEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = SessionState::new();
        let shared = Arc::new(SharedState::new(state.session_id));
        let shutdown_timeout = config.shutdown_timeout;

        let session = SessionLoop {
            api: Arc::new(api),
            config,
            event_tx,
            internal_tx,
            shared: Arc::clone(&shared),
            state,
            phase: Phase::Lobby,
            timers: Timers::new(),
            generation: 0,
            remaining_secs: 0.0,
            answer_locked: false,
            ready_latched: false,
            countdown_left: 0,
            finish_streak: 0,
            pending_advance: AdvanceTarget::None,
        };

        let task = tokio::spawn(session.run(cmd_rx, internal_rx, shutdown_rx));

        let client = Self {
            cmd_tx,
            shared,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Create a game room (solo or multiplayer).
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::InvalidInput`] when the player name is blank —
    /// no network call is made in that case — or
    /// [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn create_game(&self, params: CreateGameParams) -> Result<()> {
        if params.player_name.trim().is_empty() {
            return Err(TriviaError::InvalidInput("player name is required".into()));
        }
        self.send(Command::CreateGame(params))
    }

    /// List rooms currently accepting players; the result arrives as an
    /// [`TriviaEvent::OpenGames`] event.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn list_open_games(&self) -> Result<()> {
        self.send(Command::ListGames)
    }

    /// Join a room as a guest. Pair with
    /// [`parse_join_link`](crate::protocol::parse_join_link) for share-link
    /// flows.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::InvalidInput`] when the player name is blank —
    /// joining never fires a network call without a name — or
    /// [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn join_game(&self, game_id: GameId, player_name: impl Into<String>) -> Result<()> {
        let player_name = player_name.into();
        if player_name.trim().is_empty() {
            return Err(TriviaError::InvalidInput("player name is required".into()));
        }
        self.send(Command::JoinGame {
            game_id,
            player_name,
        })
    }

    /// Start the current room (creator only).
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn start_game(&self) -> Result<()> {
        self.send(Command::StartGame)
    }

    /// Lock in the option at `index` for the current question.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn select_answer(&self, index: usize) -> Result<()> {
        self.send(Command::SelectAnswer { index })
    }

    /// Leave the current room.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn leave_game(&self, reason: impl Into<String>) -> Result<()> {
        self.send(Command::LeaveGame {
            reason: reason.into(),
        })
    }

    /// Reset the session back to the lobby: clears all timers, regenerates
    /// the session id, zeroes all score and progress fields.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Ask the server to clean up stale rooms.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::ClientClosed`] if the session loop has exited.
    pub fn cleanup_expired(&self) -> Result<()> {
        self.send(Command::CleanupExpired)
    }

    /// Shut down the client, stopping the session loop and all its timers.
    ///
    /// After this method returns, the event receiver will yield the final
    /// `SessionClosed` event followed by `None`.
    pub async fn shutdown(&mut self) {
        debug!("TriviaClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the session loop with a timeout. If it doesn't exit in time,
        // abort it so the task cannot detach and run indefinitely.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.shared.running.store(false, Ordering::Release);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` while the session loop is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Returns the current session phase.
    pub async fn current_phase(&self) -> Phase {
        *self.shared.phase.lock().await
    }

    /// Returns the current game id, if the client is in a game.
    pub async fn current_game_id(&self) -> Option<GameId> {
        *self.shared.game_id.lock().await
    }

    /// Returns this client's guest id within the current game, if any.
    pub async fn current_guest_id(&self) -> Option<GuestId> {
        *self.shared.guest_id.lock().await
    }

    /// Returns the local session id. Regenerated on every reset.
    pub async fn session_id(&self) -> Uuid {
        *self.shared.session_id.lock().await
    }

    /// Returns the local running score.
    pub fn score(&self) -> u32 {
        self.shared.score.load(Ordering::Acquire)
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Queue a `Command` to the session loop.
    fn send(&self, cmd: Command) -> Result<()> {
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(TriviaError::ClientClosed);
        }
        self.cmd_tx
            .send(cmd)
            .map_err(|_| TriviaError::ClientClosed)
    }
}

impl std::fmt::Debug for TriviaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriviaClient")
            .field("running", &self.is_running())
            .field("score", &self.score())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for TriviaClient {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful shutdown.
        // Aborting the task drops the session loop future and its internal
        // receiver; any timer task still running notices the closed channel
        // on its next tick and winds down.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Background driver owning session state, the timer registry, and the
/// phase machine.
struct SessionLoop {
    api: Arc<dyn GameApi>,
    config: TriviaConfig,
    event_tx: mpsc::Sender<TriviaEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    shared: Arc<SharedState>,
    state: SessionState,
    phase: Phase,
    timers: Timers,
    /// Bumped by every cleanup; messages from older generations are inert.
    generation: u64,
    /// Seconds left on the current question's timer.
    remaining_secs: f64,
    /// Once locked, further answer selections are ignored.
    answer_locked: bool,
    /// Latched when the progress poll first reports ready, so a duplicate
    /// ready observation cannot re-trigger the transition.
    ready_latched: bool,
    countdown_left: u32,
    /// Consecutive finished-players polls satisfying the completion
    /// condition. The round only ends once this reaches 2.
    finish_streak: u32,
    pending_advance: AdvanceTarget,
}

impl SessionLoop {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut internal_rx: mpsc::UnboundedReceiver<Internal>,
        mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        debug!("session loop started");

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("shutdown signal received");
                    self.close(Some("client shut down".into())).await;
                    break;
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.on_command(cmd).await,
                        // Command channel closed — client handle dropped.
                        None => {
                            debug!("command channel closed, shutting down session loop");
                            self.close(Some("client shut down".into())).await;
                            break;
                        }
                    }
                }

                Some(msg) = internal_rx.recv() => {
                    self.on_internal(msg).await;
                }
            }
        }

        debug!("session loop exited");
    }

    // ── Command handling ────────────────────────────────────────────

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::CreateGame(params) => self.handle_create(params).await,
            Command::ListGames => self.handle_list().await,
            Command::JoinGame {
                game_id,
                player_name,
            } => self.handle_join(game_id, player_name).await,
            Command::StartGame => self.handle_start().await,
            Command::SelectAnswer { index } => self.handle_select(index).await,
            Command::LeaveGame { reason } => self.handle_leave(reason).await,
            Command::Reset => self.reset_session().await,
            Command::CleanupExpired => {
                if let Err(e) = self.api.cleanup_expired().await {
                    warn!("cleanup-expired failed: {e}");
                    self.emit(TriviaEvent::Error {
                        message: format!("cleanup failed: {e}"),
                    })
                    .await;
                }
            }
        }
    }

    async fn handle_create(&mut self, params: CreateGameParams) {
        if !self.accept_from_lobby().await {
            return;
        }

        let mode = if params.solo {
            GameMode::Solo
        } else {
            GameMode::Multiplayer { is_creator: true }
        };
        let body = CreateGameBody {
            name: params.name,
            difficulty: params.difficulty,
            max_players: if params.solo { 1 } else { params.max_players },
            questions_per_game: params.questions_per_game,
            time_per_question: params.time_per_question,
            player_name: params.player_name.clone(),
            is_solo: params.solo,
        };

        match self.api.create_game(body).await {
            Ok(entry) => {
                self.state.user = Some(LocalUser::new(params.player_name, params.difficulty));
                self.state.mode = Some(mode);
                self.enter_game(entry.game.clone(), entry.participant.clone()).await;
                self.emit(TriviaEvent::GameCreated(Box::new(entry))).await;
                if mode.is_solo() {
                    self.enter_loading().await;
                } else {
                    self.enter_room_waiting().await;
                }
            }
            Err(e) => {
                error!("create game failed: {e}");
                self.emit(TriviaEvent::Error {
                    message: format!("could not create game: {e}"),
                })
                .await;
                self.reset_session().await;
            }
        }
    }

    async fn handle_list(&mut self) {
        match self.api.list_waiting_games().await {
            Ok(games) => self.emit(TriviaEvent::OpenGames { games }).await,
            Err(e) => {
                warn!("listing open games failed: {e}");
                self.emit(TriviaEvent::Error {
                    message: format!("could not list games: {e}"),
                })
                .await;
            }
        }
    }

    async fn handle_join(&mut self, game_id: GameId, player_name: String) {
        if !self.accept_from_lobby().await {
            return;
        }

        let body = JoinGuestBody {
            player_name: player_name.clone(),
        };
        match self.api.join_guest(game_id, body).await {
            Ok(entry) => {
                self.state.user = Some(LocalUser::new(player_name, entry.game.difficulty));
                self.state.mode = Some(GameMode::Multiplayer { is_creator: false });
                self.enter_game(entry.game.clone(), entry.participant.clone()).await;
                self.emit(TriviaEvent::GameJoined(Box::new(entry))).await;
                self.enter_room_waiting().await;
            }
            Err(e) => {
                error!("joining game {game_id} failed: {e}");
                self.emit(TriviaEvent::Error {
                    message: format!("could not join game: {e}"),
                })
                .await;
                self.reset_session().await;
            }
        }
    }

    async fn handle_start(&mut self) {
        if self.phase != Phase::RoomWaiting
            || !self.state.mode.is_some_and(GameMode::is_creator)
        {
            self.emit(TriviaEvent::Error {
                message: "only the room creator can start a waiting game".into(),
            })
            .await;
            return;
        }
        let (Some(game_id), Some(guest_id)) = (self.state.game_id(), self.state.guest_id())
        else {
            return;
        };

        match self
            .api
            .start_guest(game_id, StartGuestBody { guest_id })
            .await
        {
            Ok(()) => self.enter_loading().await,
            Err(e) => {
                error!("starting game {game_id} failed: {e}");
                self.emit(TriviaEvent::Error {
                    message: format!("could not start game: {e}"),
                })
                .await;
            }
        }
    }

    async fn handle_select(&mut self, index: usize) {
        if self.phase != Phase::Question {
            debug!("ignoring answer selection outside the question phase");
            return;
        }
        if self.answer_locked {
            debug!("ignoring answer selection: already locked");
            return;
        }
        let Some(question) = self.state.current_question().cloned() else {
            return;
        };
        let Some(selected) = question.options.get(index).cloned() else {
            self.emit(TriviaEvent::Error {
                message: format!("option {index} is out of range"),
            })
            .await;
            return;
        };

        self.answer_locked = true;
        self.timers.clear(TimerKind::QuestionTimer);

        let correct = selected == question.correct_answer;
        let awarded = self.score_current(&question, correct);

        // Mirror the answer to the server for multiplayer rounds. Failures
        // are logged and do not disturb the local mirror.
        if self.state.mode.is_some_and(|m| !m.is_solo()) {
            if let (Some(game_id), Some(guest_id)) =
                (self.state.game_id(), self.state.guest_id())
            {
                let body = AnswerBody {
                    selected_answer: selected.clone(),
                    time_taken: question.difficulty.time_limit_secs() - self.remaining_secs,
                    guest_id,
                };
                if let Err(e) = self.api.submit_answer(game_id, question.id, body).await {
                    warn!("answer submission failed: {e}");
                }
            }
        }

        self.finish_question(Some(selected), correct, awarded, &question)
            .await;
    }

    async fn handle_leave(&mut self, reason: String) {
        match self.phase {
            Phase::Lobby => {
                self.emit(TriviaEvent::Error {
                    message: "not in a game".into(),
                })
                .await;
            }
            Phase::Results => {
                // Round already over; nothing to tell the server.
                self.emit(TriviaEvent::LeftGame).await;
                self.reset_session().await;
            }
            _ => {
                if let (Some(game_id), Some(guest_id)) =
                    (self.state.game_id(), self.state.guest_id())
                {
                    let body = LeaveBody { guest_id, reason };
                    if let Err(e) = self.api.leave(game_id, body).await {
                        warn!("leave notification failed: {e}");
                    }
                }
                self.emit(TriviaEvent::LeftGame).await;
                self.reset_session().await;
            }
        }
    }

    /// Gate for create/join commands: allowed from the lobby, and from the
    /// results screen after an implicit reset.
    async fn accept_from_lobby(&mut self) -> bool {
        match self.phase {
            Phase::Lobby => true,
            Phase::Results => {
                self.reset_session().await;
                true
            }
            _ => {
                self.emit(TriviaEvent::Error {
                    message: "already in a game".into(),
                })
                .await;
                false
            }
        }
    }

    // ── Internal message handling ───────────────────────────────────

    async fn on_internal(&mut self, msg: Internal) {
        if msg.generation() != self.generation {
            debug!("dropping stale {msg:?} (current generation {})", self.generation);
            return;
        }

        match msg {
            Internal::RoomSnapshot { game, .. } => self.on_room_snapshot(*game).await,
            Internal::RoomPollLapsed { .. } => self.on_room_poll_lapsed().await,
            Internal::LoadingSnapshot { game, progress, .. } => {
                self.on_loading_snapshot(*game, progress).await;
            }
            Internal::LoadingLapsed { .. } => self.on_loading_lapsed().await,
            Internal::Tick { .. } => self.on_tick().await,
            Internal::Advance { .. } => self.on_advance().await,
            Internal::FinishedSnapshot { finished, .. } => {
                self.on_finished_snapshot(finished).await;
            }
            Internal::FinishWaitLapsed { .. } => self.on_finish_wait_lapsed().await,
        }
    }

    async fn on_room_snapshot(&mut self, game: Game) {
        if self.phase != Phase::RoomWaiting {
            return;
        }
        // Cancellation wins over every other observation.
        if game.status.is_cancelled() {
            self.cancel_game().await;
            return;
        }

        let started = game.status.has_started();
        self.state.game = Some(game.clone());
        self.emit(TriviaEvent::RoomUpdated(Box::new(game))).await;

        if started {
            // The guest path: the creator normally transitions via its own
            // explicit start command before ever observing this.
            self.enter_loading().await;
        }
    }

    async fn on_room_poll_lapsed(&mut self) {
        if self.phase != Phase::RoomWaiting {
            return;
        }
        self.timers.clear(TimerKind::GameUpdate);
        if self.state.mode.is_some_and(GameMode::is_creator) {
            warn!("room-status polling lapsed for the creator");
            self.emit(TriviaEvent::Error {
                message: "room status updates lapsed; start the game or leave".into(),
            })
            .await;
        } else {
            // A guest that somehow missed the start signal moves forward
            // anyway rather than waiting on a status that may never arrive.
            warn!("room-status polling lapsed; proceeding to loading");
            self.enter_loading().await;
        }
    }

    async fn on_loading_snapshot(&mut self, game: Game, progress: Progress) {
        if self.phase != Phase::Loading {
            return;
        }
        if game.status.is_cancelled() {
            self.cancel_game().await;
            return;
        }

        // A round everyone already finished (e.g. this client re-entered
        // mid-game) skips straight to the results.
        if everyone_finished(&game) {
            self.state.game = Some(game);
            self.finish_round().await;
            return;
        }

        self.state.game = Some(game.clone());
        self.emit(TriviaEvent::LoadingProgress {
            generated: progress.generated,
            total: progress.total,
        })
        .await;

        if progress.is_ready && !self.ready_latched {
            self.ready_latched = true;
            self.timers.clear(TimerKind::Progress);
            self.load_questions(game).await;
        }
    }

    async fn on_loading_lapsed(&mut self) {
        if self.phase != Phase::Loading {
            return;
        }
        error!("question generation timed out");
        self.emit(TriviaEvent::Error {
            message: "question generation timed out".into(),
        })
        .await;
        self.reset_session().await;
    }

    async fn on_tick(&mut self) {
        match self.phase {
            Phase::Countdown => {
                self.countdown_left = self.countdown_left.saturating_sub(1);
                if self.countdown_left == 0 {
                    self.present_question().await;
                } else {
                    let seconds_left = self.countdown_left;
                    self.emit(TriviaEvent::CountdownTick { seconds_left }).await;
                }
            }
            Phase::Question if !self.answer_locked => {
                self.remaining_secs -= 1.0;
                if self.remaining_secs > 0.0 {
                    self.emit(TriviaEvent::TimerTick {
                        index: self.state.current_index,
                        remaining_secs: self.remaining_secs,
                    })
                    .await;
                } else {
                    self.remaining_secs = 0.0;
                    self.timeout_question().await;
                }
            }
            _ => {}
        }
    }

    async fn on_advance(&mut self) {
        match self.pending_advance {
            AdvanceTarget::None => {}
            AdvanceTarget::Countdown => {
                self.pending_advance = AdvanceTarget::None;
                self.begin_countdown().await;
            }
            AdvanceTarget::NextQuestion => {
                self.pending_advance = AdvanceTarget::None;
                self.next_question().await;
            }
        }
    }

    async fn on_finished_snapshot(&mut self, finished: usize) {
        if self.phase != Phase::WaitingForOthers {
            return;
        }
        let total = self.state.participant_count();
        self.emit(TriviaEvent::WaitingForPlayers { finished, total })
            .await;

        // Debounce against a transient undercount: the finished roster must
        // cover every participant on two consecutive polls before the round
        // is declared complete.
        if total > 0 && finished >= total {
            self.finish_streak += 1;
            if self.finish_streak >= 2 {
                self.finish_round().await;
            }
        } else {
            self.finish_streak = 0;
        }
    }

    async fn on_finish_wait_lapsed(&mut self) {
        if self.phase != Phase::WaitingForOthers {
            return;
        }
        warn!("finish wait ceiling reached; forcing completion");
        if let (Some(game_id), Some(guest_id)) = (self.state.game_id(), self.state.guest_id()) {
            if let Err(e) = self
                .api
                .force_complete(game_id, GuestBody { guest_id })
                .await
            {
                warn!("force-complete failed: {e}");
            }
        }
        self.finish_round().await;
    }

    // ── Phase transitions ───────────────────────────────────────────

    /// The cleanup routine: bumps the generation (making every outstanding
    /// timer message inert) and clears all three timer slots. Idempotent, and
    /// the only path through which slots are cleared in bulk.
    fn cleanup_phase(&mut self) {
        self.generation += 1;
        self.timers.cancel_all();
        self.pending_advance = AdvanceTarget::None;
    }

    /// Full session reset: cleanup plus fresh session identity and zeroed
    /// score/progress fields. Lands in the lobby.
    async fn reset_session(&mut self) {
        self.cleanup_phase();
        self.state.reset();
        self.ready_latched = false;
        self.answer_locked = false;
        self.finish_streak = 0;
        self.remaining_secs = 0.0;
        self.countdown_left = 0;
        *self.shared.game_id.lock().await = None;
        *self.shared.guest_id.lock().await = None;
        *self.shared.session_id.lock().await = self.state.session_id;
        self.shared.score.store(0, Ordering::Release);
        self.set_phase(Phase::Lobby).await;
    }

    async fn enter_game(&mut self, game: Game, participant: crate::protocol::Participant) {
        *self.shared.game_id.lock().await = Some(game.id);
        *self.shared.guest_id.lock().await = Some(participant.guest_id);
        self.state.game = Some(game);
        self.state.participant = Some(participant);
    }

    async fn enter_room_waiting(&mut self) {
        self.cleanup_phase();
        self.set_phase(Phase::RoomWaiting).await;
        self.spawn_room_poller();
    }

    async fn enter_loading(&mut self) {
        self.cleanup_phase();
        self.ready_latched = false;
        self.set_phase(Phase::Loading).await;
        self.spawn_progress_poller();
    }

    /// Fetch the generated question set, then pause briefly before the
    /// countdown so the ready state is visible.
    async fn load_questions(&mut self, game: Game) {
        let questions = if game.questions.as_ref().is_some_and(|qs| !qs.is_empty()) {
            game.questions.unwrap_or_default()
        } else {
            let api = Arc::clone(&self.api);
            let game_id = game.id;
            let fetched = with_retries(
                self.config.finish_retry_attempts,
                self.config.finish_retry_backoff,
                move || {
                    let api = Arc::clone(&api);
                    async move {
                        let game = api.fetch_game(game_id).await?;
                        game.questions
                            .filter(|qs| !qs.is_empty())
                            .ok_or_else(|| TriviaError::Api {
                                status: 404,
                                message: "questions not available yet".into(),
                            })
                    }
                },
            )
            .await;
            match fetched {
                Ok(questions) => questions,
                Err(e) => {
                    error!("fetching questions failed: {e}");
                    self.emit(TriviaEvent::Error {
                        message: format!("could not fetch questions: {e}"),
                    })
                    .await;
                    self.reset_session().await;
                    return;
                }
            }
        };

        self.state.questions = questions;
        self.state.current_index = 0;
        self.emit(TriviaEvent::QuestionsReady {
            count: self.state.questions.len(),
        })
        .await;

        self.pending_advance = AdvanceTarget::Countdown;
        self.schedule_advance(self.config.ready_delay);
    }

    async fn begin_countdown(&mut self) {
        self.cleanup_phase();
        self.set_phase(Phase::Countdown).await;
        self.countdown_left = self.config.countdown_seconds;
        if self.countdown_left == 0 {
            self.present_question().await;
            return;
        }
        let seconds_left = self.countdown_left;
        self.emit(TriviaEvent::CountdownTick { seconds_left }).await;
        self.spawn_ticker();
    }

    async fn present_question(&mut self) {
        self.cleanup_phase();
        let Some(question) = self.state.current_question().cloned() else {
            self.end_of_round().await;
            return;
        };

        self.set_phase(Phase::Question).await;
        self.answer_locked = false;
        self.remaining_secs = question.difficulty.time_limit_secs();
        self.emit(TriviaEvent::QuestionPresented {
            index: self.state.current_index,
            total: self.state.questions.len(),
            time_limit_secs: self.remaining_secs,
            question,
        })
        .await;
        self.spawn_ticker();
    }

    /// Timer expiry with no locked answer: scored as an automatic incorrect
    /// answer, correct answer revealed. Deliberately never submitted — the
    /// server rejects empty answers with a 400.
    async fn timeout_question(&mut self) {
        let Some(question) = self.state.current_question().cloned() else {
            return;
        };
        self.answer_locked = true;
        self.timers.clear(TimerKind::QuestionTimer);
        self.finish_question(None, false, 0, &question).await;
    }

    /// Common tail of both answer paths: record, emit feedback, and schedule
    /// the advance after the feedback delay.
    async fn finish_question(
        &mut self,
        selected: Option<String>,
        correct: bool,
        awarded: u32,
        question: &Question,
    ) {
        self.state.record_answer(correct, awarded);
        let total_score = self.state.user.as_ref().map_or(0, |u| u.score);
        self.shared.score.store(total_score, Ordering::Release);

        self.emit(TriviaEvent::AnswerScored {
            index: self.state.current_index,
            selected,
            correct,
            awarded,
            correct_answer: question.correct_answer.clone(),
            total_score,
        })
        .await;

        self.pending_advance = AdvanceTarget::NextQuestion;
        self.schedule_advance(self.config.feedback_delay);
    }

    fn score_current(&self, question: &Question, correct: bool) -> u32 {
        let count = scoring::count_at_difficulty(&self.state.questions, question.difficulty);
        scoring::score_answer(correct, self.remaining_secs, question.difficulty, count)
    }

    async fn next_question(&mut self) {
        // No interval poll runs during the question loop, so a cancelled
        // room is caught here, at the question boundary.
        if self.state.mode.is_some_and(|m| !m.is_solo()) {
            if let Some(game_id) = self.state.game_id() {
                match self.api.fetch_game(game_id).await {
                    Ok(game) if game.status.is_cancelled() => {
                        self.cancel_game().await;
                        return;
                    }
                    Ok(game) => self.state.game = Some(game),
                    Err(e) => warn!("question-boundary status check failed: {e}"),
                }
            }
        }

        self.state.advance_question();
        if self.state.round_over() {
            self.end_of_round().await;
        } else {
            self.present_question().await;
        }
    }

    /// End-of-round branching: a solo round ends immediately; a multiplayer
    /// round waits for the other participants. Exactly one of the two.
    async fn end_of_round(&mut self) {
        if self.state.mode.is_some_and(GameMode::is_solo) {
            self.finish_round().await;
        } else {
            self.wait_for_others().await;
        }
    }

    async fn wait_for_others(&mut self) {
        self.cleanup_phase();
        self.set_phase(Phase::WaitingForOthers).await;
        self.finish_streak = 0;

        let (Some(game_id), Some(guest_id)) = (self.state.game_id(), self.state.guest_id())
        else {
            self.finish_round().await;
            return;
        };
        let player_name = self
            .state
            .user
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_default();

        // Mark ourselves finished. Both registrations are retried; a final
        // failure is survivable because the finish-wait ceiling will force
        // completion regardless.
        let api = Arc::clone(&self.api);
        let attempts = self.config.finish_retry_attempts;
        let backoff = self.config.finish_retry_backoff;
        if let Err(e) = with_retries(attempts, backoff, || {
            let api = Arc::clone(&api);
            async move { api.set_finished(game_id, GuestBody { guest_id }).await }
        })
        .await
        {
            warn!("set-finished failed after {attempts} attempts: {e}");
        }
        if let Err(e) = with_retries(attempts, backoff, || {
            let api = Arc::clone(&api);
            let player_name = player_name.clone();
            async move {
                api.register_finished(
                    game_id,
                    RegisterFinishedBody {
                        guest_id,
                        player_name,
                    },
                )
                .await
            }
        })
        .await
        {
            warn!("register-finished failed after {attempts} attempts: {e}");
        }

        self.spawn_finished_poller();
    }

    /// Assemble the leaderboard and deliver the results event. Three tiers
    /// for multiplayer: results endpoint, participant refetch, local state.
    /// The user is never left without a result.
    async fn finish_round(&mut self) {
        self.cleanup_phase();

        let guest_id = self.state.guest_id();
        let entries = if self.state.mode.is_some_and(GameMode::is_solo) {
            self.state
                .user
                .as_ref()
                .map(|u| local_leaderboard(u, guest_id))
                .unwrap_or_default()
        } else {
            self.multiplayer_leaderboard().await
        };

        let your_rank;
        let your_entry;
        let name = self.state.user.as_ref().map(|u| u.name.as_str()).unwrap_or("");
        match find_self_entry(&entries, guest_id, name) {
            Some(pos) => {
                your_rank = Some(pos + 1);
                your_entry = entries.get(pos).cloned();
            }
            None => {
                your_rank = None;
                your_entry = None;
            }
        }

        self.set_phase(Phase::Results).await;
        self.emit(TriviaEvent::GameFinished {
            entries,
            your_rank,
            your_entry,
        })
        .await;
    }

    async fn multiplayer_leaderboard(&mut self) -> Vec<crate::protocol::LeaderboardEntry> {
        let Some(game_id) = self.state.game_id() else {
            return self
                .state
                .user
                .as_ref()
                .map(|u| local_leaderboard(u, self.state.guest_id()))
                .unwrap_or_default();
        };

        match self.api.fetch_results(game_id).await {
            Ok(results) if !results.entries.is_empty() => return results.entries,
            Ok(_) => warn!("results endpoint returned an empty leaderboard"),
            Err(e) => warn!("results fetch failed: {e}"),
        }

        // Fallback: rebuild a ranked board from the raw participant list.
        match self.api.fetch_game(game_id).await {
            Ok(game) if !game.participants.is_empty() => {
                return rank_participants(&game.participants);
            }
            Ok(_) => warn!("participant fallback returned no participants"),
            Err(e) => warn!("participant fallback failed: {e}"),
        }

        // Last resort: a single row from local state.
        self.state
            .user
            .as_ref()
            .map(|u| local_leaderboard(u, self.state.guest_id()))
            .unwrap_or_default()
    }

    /// Server-side cancellation: always alerts, always clears every timer,
    /// always routes back to the lobby.
    async fn cancel_game(&mut self) {
        self.cleanup_phase();
        self.emit(TriviaEvent::GameCancelled {
            message: "the game was cancelled".into(),
        })
        .await;
        self.reset_session().await;
    }

    async fn set_phase(&mut self, phase: Phase) {
        debug!("phase: {:?} → {:?}", self.phase, phase);
        self.phase = phase;
        *self.shared.phase.lock().await = phase;
    }

    async fn close(&mut self, reason: Option<String>) {
        self.cleanup_phase();
        self.shared.running.store(false, Ordering::Release);
        // Always delivered: blocking send instead of try_send, because
        // SessionClosed is the final event on the channel and must never be
        // silently dropped.
        if self
            .event_tx
            .send(TriviaEvent::SessionClosed { reason })
            .await
            .is_err()
        {
            debug!("event channel closed, receiver dropped");
        }
    }

    // ── Timer tasks ─────────────────────────────────────────────────

    /// Room-status poll: 500 ms cadence against the game record, capped by
    /// the room-wait timeout.
    fn spawn_room_poller(&mut self) {
        let Some(game_id) = self.state.game_id() else {
            return;
        };
        let generation = self.generation;
        let api = Arc::clone(&self.api);
        let tx = self.internal_tx.clone();
        let interval = self.config.room_poll_interval;
        let cap = self.config.room_wait_timeout;

        let handle = tokio::spawn(async move {
            let tick_tx = tx.clone();
            let outcome = poll_until(interval, cap, move || {
                let api = Arc::clone(&api);
                let tick_tx = tick_tx.clone();
                async move {
                    let game = api.fetch_game(game_id).await?;
                    let closed = tick_tx
                        .send(Internal::RoomSnapshot {
                            generation,
                            game: Box::new(game),
                        })
                        .is_err();
                    // A closed channel means the session loop is gone.
                    Ok(closed.then_some(()))
                }
            })
            .await;
            if matches!(outcome, PollOutcome::TimedOut) {
                let _ = tx.send(Internal::RoomPollLapsed { generation });
            }
        });
        self.timers.set(TimerKind::GameUpdate, handle.abort_handle());
    }

    /// Progress poll: fetches the game record first (the cancellation check
    /// must see the freshest status), then the generation progress.
    fn spawn_progress_poller(&mut self) {
        let Some(game_id) = self.state.game_id() else {
            return;
        };
        let generation = self.generation;
        let api = Arc::clone(&self.api);
        let tx = self.internal_tx.clone();
        let interval = self.config.progress_poll_interval;
        let cap = self.config.loading_timeout;

        let handle = tokio::spawn(async move {
            let tick_tx = tx.clone();
            let outcome = poll_until(interval, cap, move || {
                let api = Arc::clone(&api);
                let tick_tx = tick_tx.clone();
                async move {
                    let game = api.fetch_game(game_id).await?;
                    let progress = api.fetch_progress(game_id).await?;
                    let closed = tick_tx
                        .send(Internal::LoadingSnapshot {
                            generation,
                            game: Box::new(game),
                            progress,
                        })
                        .is_err();
                    Ok(closed.then_some(()))
                }
            })
            .await;
            if matches!(outcome, PollOutcome::TimedOut) {
                let _ = tx.send(Internal::LoadingLapsed { generation });
            }
        });
        self.timers.set(TimerKind::Progress, handle.abort_handle());
    }

    /// Finished-players poll during the finish wait, capped by the forced
    /// completion ceiling.
    fn spawn_finished_poller(&mut self) {
        let Some(game_id) = self.state.game_id() else {
            return;
        };
        let generation = self.generation;
        let api = Arc::clone(&self.api);
        let tx = self.internal_tx.clone();
        let interval = self.config.finished_poll_interval;
        let cap = self.config.finished_wait_timeout;

        let handle = tokio::spawn(async move {
            let tick_tx = tx.clone();
            let outcome = poll_until(interval, cap, move || {
                let api = Arc::clone(&api);
                let tick_tx = tick_tx.clone();
                async move {
                    let roster = api.finished_players(game_id).await?;
                    let closed = tick_tx
                        .send(Internal::FinishedSnapshot {
                            generation,
                            finished: roster.count(),
                        })
                        .is_err();
                    Ok(closed.then_some(()))
                }
            })
            .await;
            if matches!(outcome, PollOutcome::TimedOut) {
                let _ = tx.send(Internal::FinishWaitLapsed { generation });
            }
        });
        self.timers.set(TimerKind::GameUpdate, handle.abort_handle());
    }

    /// Once-per-second ticker for the countdown and question timers.
    fn spawn_ticker(&mut self) {
        let generation = self.generation;
        let tx = self.internal_tx.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick resolves immediately; the timer starts one full
            // period out.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(Internal::Tick { generation }).is_err() {
                    break;
                }
            }
        });
        self.timers
            .set(TimerKind::QuestionTimer, handle.abort_handle());
    }

    /// One-shot delayed advance, the equivalent of a scheduled timeout. Not
    /// tracked in the registry: a stale one is dropped by the generation
    /// guard.
    fn schedule_advance(&mut self, delay: Duration) {
        let generation = self.generation;
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Internal::Advance { generation });
        });
    }

    // ── Event emission ──────────────────────────────────────────────

    /// Emit an event. If the channel is full, log a warning and drop the
    /// event to avoid blocking the session loop.
    async fn emit(&self, event: TriviaEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    "event channel full, dropping event: {:?}",
                    std::mem::discriminant(&dropped)
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{FinishedPlayers, GameEntry, GameResults, QuestionId};
    use async_trait::async_trait;

    /// A backend where every call fails, for handle-level tests.
    struct OfflineApi;

    #[async_trait]
    impl GameApi for OfflineApi {
        async fn create_game(&self, _body: CreateGameBody) -> Result<GameEntry> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn list_waiting_games(&self) -> Result<Vec<Game>> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn fetch_game(&self, _id: GameId) -> Result<Game> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn join_guest(&self, _id: GameId, _body: JoinGuestBody) -> Result<GameEntry> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn start_guest(&self, _id: GameId, _body: StartGuestBody) -> Result<()> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn fetch_progress(&self, _id: GameId) -> Result<Progress> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn submit_answer(
            &self,
            _id: GameId,
            _question: QuestionId,
            _body: AnswerBody,
        ) -> Result<()> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn set_finished(&self, _id: GameId, _body: GuestBody) -> Result<()> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn register_finished(
            &self,
            _id: GameId,
            _body: RegisterFinishedBody,
        ) -> Result<()> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn finished_players(&self, _id: GameId) -> Result<FinishedPlayers> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn force_complete(&self, _id: GameId, _body: GuestBody) -> Result<()> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn fetch_results(&self, _id: GameId) -> Result<GameResults> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn leave(&self, _id: GameId, _body: LeaveBody) -> Result<()> {
            Err(TriviaError::Http("offline".into()))
        }
        async fn cleanup_expired(&self) -> Result<()> {
            Err(TriviaError::Http("offline".into()))
        }
    }

    #[tokio::test]
    async fn config_defaults() {
        let config = TriviaConfig::new();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.room_poll_interval, Duration::from_millis(500));
        assert_eq!(config.room_wait_timeout, Duration::from_secs(30));
        assert_eq!(config.progress_poll_interval, Duration::from_secs(1));
        assert_eq!(config.loading_timeout, Duration::from_secs(300));
        assert_eq!(config.countdown_seconds, 3);
        assert_eq!(config.feedback_delay, Duration::from_secs(2));
        assert_eq!(config.finished_poll_interval, Duration::from_millis(1500));
        assert_eq!(config.finished_wait_timeout, Duration::from_secs(20));
        assert_eq!(config.finish_retry_attempts, 3);
        assert_eq!(config.finish_retry_backoff, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn config_builder_methods() {
        let config = TriviaConfig::new()
            .with_event_channel_capacity(512)
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_room_polling(Duration::from_millis(100), Duration::from_secs(2))
            .with_countdown_seconds(1)
            .with_feedback_delay(Duration::from_millis(50));
        assert_eq!(config.event_channel_capacity, 512);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.room_poll_interval, Duration::from_millis(100));
        assert_eq!(config.room_wait_timeout, Duration::from_secs(2));
        assert_eq!(config.countdown_seconds, 1);
        assert_eq!(config.feedback_delay, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn event_channel_capacity_is_clamped_to_one() {
        let config = TriviaConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn create_game_params_builder() {
        let params = CreateGameParams::new("room", "Alice")
            .with_difficulty(Difficulty::Expert)
            .with_max_players(6)
            .with_questions_per_game(5)
            .with_time_per_question(15.0)
            .with_solo(false);
        assert_eq!(params.name, "room");
        assert_eq!(params.player_name, "Alice");
        assert_eq!(params.difficulty, Difficulty::Expert);
        assert_eq!(params.max_players, 6);
        assert_eq!(params.questions_per_game, 5);
        assert_eq!(params.time_per_question, Some(15.0));
        assert!(!params.solo);
    }

    #[tokio::test]
    async fn blank_player_name_is_rejected_without_a_network_call() {
        let (client, _events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        let err = client.join_game(42, "   ").unwrap_err();
        assert!(matches!(err, TriviaError::InvalidInput(_)));
        let err = client
            .create_game(CreateGameParams::new("room", ""))
            .unwrap_err();
        assert!(matches!(err, TriviaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_failure_emits_error_and_returns_to_lobby() {
        let (client, mut events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        client
            .create_game(CreateGameParams::new("room", "Alice"))
            .unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event, TriviaEvent::Error { .. }));
        assert_eq!(client.current_phase().await, Phase::Lobby);
    }

    #[tokio::test]
    async fn commands_fail_after_shutdown() {
        let (mut client, _events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        client.shutdown().await;
        let result = client.list_open_games();
        assert!(matches!(result, Err(TriviaError::ClientClosed)));
    }

    #[tokio::test]
    async fn shutdown_emits_session_closed() {
        let (mut client, mut events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        client.shutdown().await;

        let event = events.recv().await.unwrap();
        if let TriviaEvent::SessionClosed { reason } = event {
            assert_eq!(reason.as_deref(), Some("client shut down"));
        } else {
            panic!("expected SessionClosed, got {event:?}");
        }
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (mut client, _events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (client, mut events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        drop(client);
        // The session task is aborted; the channel closes without hanging.
        while let Some(_event) = events.recv().await {}
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (mut client, _events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("TriviaClient"));
        assert!(debug_str.contains("running"));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn fresh_client_starts_in_the_lobby() {
        let (mut client, _events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        assert!(client.is_running());
        assert_eq!(client.current_phase().await, Phase::Lobby);
        assert_eq!(client.current_game_id().await, None);
        assert_eq!(client.current_guest_id().await, None);
        assert_eq!(client.score(), 0);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn reset_regenerates_the_session_id() {
        let (mut client, _events) = TriviaClient::start(OfflineApi, TriviaConfig::new());
        let before = client.session_id().await;
        client.reset().unwrap();
        // Give the loop a moment to process.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after = client.session_id().await;
        assert_ne!(before, after);
        client.shutdown().await;
    }
}
