//! Local session state and the pure pieces of the game state machine.
//!
//! [`SessionState`] is the single mutable record a session owns: who the
//! local player is, which game they are in, the fetched question set, and the
//! cursor into it. It is owned by the session loop and never shared, so the
//! transition helpers here can stay synchronous and unit-testable.

use uuid::Uuid;

use crate::protocol::{
    Difficulty, Game, GameId, GuestId, LeaderboardEntry, Participant, Question,
};

/// UI-facing phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No game in progress; create/join/list commands are accepted.
    #[default]
    Lobby,
    /// In a room, waiting for players / the start signal.
    RoomWaiting,
    /// Questions are being generated server-side.
    Loading,
    /// Pre-round countdown.
    Countdown,
    /// A question is on screen.
    Question,
    /// Own round done; waiting for the other participants (multiplayer).
    WaitingForOthers,
    /// Final leaderboard delivered.
    Results,
}

/// Whether this session plays alone or in a shared room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Solo,
    Multiplayer {
        /// `true` when this client created the room (guest id 0).
        is_creator: bool,
    },
}

impl GameMode {
    pub fn is_solo(self) -> bool {
        matches!(self, Self::Solo)
    }

    pub fn is_creator(self) -> bool {
        matches!(self, Self::Multiplayer { is_creator: true })
    }
}

/// The local player record, created at login/create and mutated as answers
/// are scored. Destroyed on reset.
#[derive(Debug, Clone)]
pub struct LocalUser {
    pub name: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub correct_answers: u32,
}

impl LocalUser {
    pub fn new(name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            name: name.into(),
            difficulty,
            score: 0,
            correct_answers: 0,
        }
    }
}

/// Ephemeral per-session state. Lifetime: one client, reset between rounds.
#[derive(Debug)]
pub struct SessionState {
    /// Opaque local session identity, regenerated on every reset.
    pub session_id: Uuid,
    pub user: Option<LocalUser>,
    /// Server game record, replaced wholesale on every successful poll.
    pub game: Option<Game>,
    /// This client's participant record. Authoritative fields are never
    /// mutated locally.
    pub participant: Option<Participant>,
    /// Question set, fetched once per round, immutable afterwards.
    pub questions: Vec<Question>,
    /// Cursor into `questions`; monotonically increasing within a round and
    /// never exceeding `questions.len()`.
    pub current_index: usize,
    pub mode: Option<GameMode>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user: None,
            game: None,
            participant: None,
            questions: Vec::new(),
            current_index: 0,
            mode: None,
        }
    }

    /// Full session reset: fresh session id, all score and progress fields
    /// zeroed, game mirror dropped.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.game.as_ref().map(|g| g.id)
    }

    pub fn guest_id(&self) -> Option<GuestId> {
        self.participant.as_ref().map(|p| p.guest_id)
    }

    /// Number of participants in the last game snapshot.
    pub fn participant_count(&self) -> usize {
        self.game.as_ref().map_or(0, |g| g.participants.len())
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    /// `true` once the cursor has passed the last question.
    pub fn round_over(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    /// Advances the cursor, saturating at `questions.len()`.
    pub fn advance_question(&mut self) {
        self.current_index = (self.current_index + 1).min(self.questions.len());
    }

    /// Applies a locally scored answer to the user record.
    pub fn record_answer(&mut self, correct: bool, awarded: u32) {
        if let Some(user) = self.user.as_mut() {
            user.score += awarded;
            if correct {
                user.correct_answers += 1;
            }
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Pure transition helpers ─────────────────────────────────────────

/// `true` when every participant of `game` has finished the whole round.
///
/// Covers the reload-mid-game case: a client that re-enters the loading phase
/// of a round everyone already completed should skip straight to results.
pub fn everyone_finished(game: &Game) -> bool {
    !game.participants.is_empty()
        && game.participants.iter().all(|p| {
            p.finished_all_questions
                || p.finished_questions
                    .is_some_and(|n| n >= game.questions_per_game)
        })
}

/// Locates this client's row in a leaderboard.
///
/// Prefers the stable `guest_id` when the payload carries one; otherwise
/// falls back to a name-matching cascade (exact → case-insensitive →
/// trimmed → substring) to tolerate name-formatting drift between the local
/// record and the server's.
pub fn find_self_entry(
    entries: &[LeaderboardEntry],
    guest_id: Option<GuestId>,
    name: &str,
) -> Option<usize> {
    if let Some(id) = guest_id {
        if let Some(pos) = entries.iter().position(|e| e.guest_id == Some(id)) {
            return Some(pos);
        }
    }

    if let Some(pos) = entries.iter().position(|e| e.player_name == name) {
        return Some(pos);
    }

    let lowered = name.to_lowercase();
    if let Some(pos) = entries
        .iter()
        .position(|e| e.player_name.to_lowercase() == lowered)
    {
        return Some(pos);
    }

    let trimmed = lowered.trim();
    if let Some(pos) = entries
        .iter()
        .position(|e| e.player_name.to_lowercase().trim() == trimmed)
    {
        return Some(pos);
    }

    entries.iter().position(|e| {
        let candidate = e.player_name.to_lowercase();
        let candidate = candidate.trim();
        !candidate.is_empty() && (candidate.contains(trimmed) || trimmed.contains(candidate))
    })
}

/// Rebuilds a ranked leaderboard from raw participant records, highest score
/// first. Used when the results endpoint returns nothing usable.
pub fn rank_participants(participants: &[Participant]) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = participants
        .iter()
        .map(|p| LeaderboardEntry {
            guest_id: Some(p.guest_id),
            player_name: p.player_name.clone(),
            score: p.score,
            correct_answers: p.correct_answers,
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

/// Last-resort leaderboard: a single row built from purely local state, so
/// the user is never left without a results screen.
pub fn local_leaderboard(user: &LocalUser, guest_id: Option<GuestId>) -> Vec<LeaderboardEntry> {
    vec![LeaderboardEntry {
        guest_id,
        player_name: user.name.clone(),
        score: user.score,
        correct_answers: user.correct_answers,
    }]
}
