//! Named timer registry for the session loop.
//!
//! A session has three recurring timer slots: the game-update poll, the
//! question-generation progress poll, and the per-question countdown. At most
//! one task may be live per slot, and a slot must be cleared before a
//! replacement is armed. Centralizing the handles here gives the cleanup
//! routine a single `cancel_all` entry point and removes the class of bugs
//! where a stale poller outlives its phase.

use tokio::task::AbortHandle;
use tracing::debug;

/// The three recurring timer slots of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Room-status / finished-players polling.
    GameUpdate,
    /// Question-generation progress polling.
    Progress,
    /// Per-question countdown ticking.
    QuestionTimer,
}

/// Registry owning the abort handles of the live timer tasks.
#[derive(Debug, Default)]
pub struct Timers {
    game_update: Option<AbortHandle>,
    progress: Option<AbortHandle>,
    question_timer: Option<AbortHandle>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<AbortHandle> {
        match kind {
            TimerKind::GameUpdate => &mut self.game_update,
            TimerKind::Progress => &mut self.progress,
            TimerKind::QuestionTimer => &mut self.question_timer,
        }
    }

    /// Arms `kind` with a new task handle, aborting any previous occupant so
    /// the one-live-task-per-slot invariant holds.
    pub fn set(&mut self, kind: TimerKind, handle: AbortHandle) {
        let slot = self.slot(kind);
        if let Some(previous) = slot.take() {
            debug!("replacing live {kind:?} timer");
            previous.abort();
        }
        *slot = Some(handle);
    }

    /// Aborts and clears the task in `kind`, if any.
    pub fn clear(&mut self, kind: TimerKind) {
        if let Some(handle) = self.slot(kind).take() {
            handle.abort();
        }
    }

    /// Aborts and clears every slot. Idempotent.
    pub fn cancel_all(&mut self) {
        for kind in [
            TimerKind::GameUpdate,
            TimerKind::Progress,
            TimerKind::QuestionTimer,
        ] {
            self.clear(kind);
        }
    }

    /// Returns `true` while a task occupies `kind`.
    pub fn is_live(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::GameUpdate => self.game_update.is_some(),
            TimerKind::Progress => self.progress.is_some(),
            TimerKind::QuestionTimer => self.question_timer.is_some(),
        }
    }

    /// Returns `true` when no slot holds a task.
    pub fn all_clear(&self) -> bool {
        self.game_update.is_none() && self.progress.is_none() && self.question_timer.is_none()
    }
}
