//! Game session: one board, one score, timer-driven opponent and auto-reset.
//!
//! All state lives behind an `Arc<Mutex<_>>` shared with the timer tasks. The
//! tasks re-check the session's cancellation token and the round counter
//! after waking up, so a reset or a dropped session makes any pending
//! callback a no-op instead of a write into a stale game.

use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::bot;
use crate::core::{
    Board, CellIndex, FinishedState, GameError, GameState, Mark, TicTacToe, WinLine,
};
use crate::storage::{MatchOutcome, MatchRecord, Persisted, ScoreBoard, ScoreStore};

pub const DEFAULT_THINKING_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_COUNTDOWN_FROM: u8 = 3;
/// How many finished games the session keeps in its history log.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Both markers are driven through [`GameSession::make_move`].
    Friend,
    /// `X` is driven through [`GameSession::make_move`], `O` by the built-in
    /// opponent after a thinking delay.
    Computer,
}

impl Display for GameMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Friend => f.write_str("friend"),
            Self::Computer => f.write_str("computer"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub mode: GameMode,
    pub player_x: String,
    pub player_o: String,
    /// Delay before the computer opponent moves.
    pub thinking_delay: Duration,
    /// Interval between auto-reset countdown decrements.
    pub countdown_tick: Duration,
    /// Countdown start value; `0` disables the auto-reset entirely.
    pub countdown_from: u8,
    /// Seed for the opponent's tie-breaking; random when unset.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn with_friend(player_x: impl Into<String>, friend: impl Into<String>) -> Self {
        Self {
            mode: GameMode::Friend,
            player_x: player_x.into(),
            player_o: friend.into(),
            thinking_delay: DEFAULT_THINKING_DELAY,
            countdown_tick: DEFAULT_COUNTDOWN_TICK,
            countdown_from: DEFAULT_COUNTDOWN_FROM,
            seed: None,
        }
    }

    pub fn against_computer(player_x: impl Into<String>) -> Self {
        Self {
            mode: GameMode::Computer,
            player_o: "Computer".into(),
            ..Self::with_friend(player_x, "")
        }
    }
}

/// Why [`GameSession::make_move`] rejected an attempt. Rejections leave the
/// board untouched; `is_ok()` on the result is the accepted/rejected flag.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MoveRejected {
    #[error("computer move is pending")]
    OpponentPending,
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Immutable view of the session, published after every state change.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub board: Board,
    pub state: GameState,
    pub winning_line: Option<WinLine>,
    pub score: ScoreBoard,
    pub countdown: u8,
    pub thinking: bool,
    pub move_count: u32,
    pub mode: GameMode,
    pub player_x: String,
    pub player_o: String,
}

impl Snapshot {
    pub fn cell(&self, index: CellIndex) -> Option<Mark> {
        *self.board[index.into()]
    }

    /// Marker on turn, [`None`] once the game is finished.
    pub fn turn(&self) -> Option<Mark> {
        match self.state {
            GameState::Turn(mark) => Some(mark),
            GameState::Finished(_) => None,
        }
    }

    pub fn player_name(&self, mark: Mark) -> &str {
        match mark {
            Mark::X => &self.player_x,
            Mark::O => &self.player_o,
        }
    }

    /// Human-readable status line for display.
    pub fn status_message(&self) -> String {
        match self.state {
            GameState::Finished(FinishedState::Win(mark)) => {
                let name = self.player_name(mark);
                if self.countdown > 0 {
                    format!("{} wins! New game in {}...", name, self.countdown)
                } else {
                    format!("{} wins!", name)
                }
            }
            GameState::Finished(FinishedState::Draw) => {
                if self.countdown > 0 {
                    format!("It's a draw! New game in {}...", self.countdown)
                } else {
                    "It's a draw!".to_string()
                }
            }
            GameState::Turn(_) if self.thinking => "Computer is thinking...".to_string(),
            GameState::Turn(mark) => format!("{}'s turn", self.player_name(mark)),
        }
    }
}

struct Inner {
    game: TicTacToe,
    mode: GameMode,
    player_x: String,
    player_o: String,
    score: ScoreBoard,
    history: Vec<MatchRecord>,
    countdown: u8,
    thinking: bool,
    round: u64,
    rng: StdRng,
    store: Box<dyn ScoreStore>,
    watch_tx: watch::Sender<Snapshot>,
    thinking_delay: Duration,
    countdown_tick: Duration,
    countdown_from: u8,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.game.board().clone(),
            state: self.game.state(),
            winning_line: self.game.winning_line(),
            score: self.score,
            countdown: self.countdown,
            thinking: self.thinking,
            move_count: self.game.move_count(),
            mode: self.mode,
            player_x: self.player_x.clone(),
            player_o: self.player_o.clone(),
        }
    }

    fn publish(&self) {
        self.watch_tx.send_replace(self.snapshot());
    }

    fn save(&mut self) {
        let data = Persisted {
            score: self.score,
            history: self.history.clone(),
        };
        if let Err(err) = self.store.save(&data) {
            warn!("failed to save score: {}", err);
        }
    }

    /// Records the finished game and arms the auto-reset countdown.
    fn finish_round(&mut self, finished: FinishedState) {
        self.thinking = false;
        let outcome = MatchOutcome::from(finished);
        self.score.record(outcome);
        self.history.insert(
            0,
            MatchRecord {
                finished_at: Utc::now(),
                mode: self.mode,
                player_x: self.player_x.clone(),
                player_o: self.player_o.clone(),
                outcome,
                moves: self.game.move_count(),
            },
        );
        self.history.truncate(HISTORY_LIMIT);
        self.save();
        self.countdown = self.countdown_from;
        info!(outcome = %outcome, moves = self.game.move_count(), "game finished");
    }

    /// Discards the current game and starts a fresh one with `X` on turn.
    /// Bumping the round counter makes every pending timer callback stale.
    fn begin_round(&mut self) {
        self.round += 1;
        self.game = TicTacToe::new();
        self.countdown = 0;
        self.thinking = false;
        debug!(round = self.round, "new game started");
    }
}

fn lock_shared(shared: &Arc<Mutex<Inner>>) -> MutexGuard<'_, Inner> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the opponent move as in flight and applies it after the thinking
/// delay, unless the round changed or the session was cancelled meanwhile.
/// The opponent's move can only finish the game or hand the turn back, so no
/// further scheduling happens here beyond the auto-reset countdown.
fn schedule_computer_move(shared: &Arc<Mutex<Inner>>, ct: &CancellationToken, inner: &mut Inner) {
    inner.thinking = true;
    let round = inner.round;
    let delay = inner.thinking_delay;
    let shared = Arc::clone(shared);
    let ct = ct.clone();
    debug!("computer is thinking for {:?}", delay);
    tokio::spawn(async move {
        tokio::select! {
            _ = ct.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        let mut guard = lock_shared(&shared);
        if guard.round != round || !guard.thinking {
            return;
        }
        guard.thinking = false;
        let board = guard.game.board().clone();
        let Some(index) = bot::choose_move(&board, Mark::O, &mut guard.rng) else {
            guard.publish();
            return;
        };
        debug!(cell = %index, "computer made a move");
        match guard.game.apply(Mark::O, index) {
            Ok(GameState::Finished(finished)) => {
                guard.finish_round(finished);
                spawn_countdown(&shared, &ct, &guard);
            }
            Ok(GameState::Turn(_)) => {}
            Err(err) => warn!("computer move rejected: {}", err),
        }
        guard.publish();
    });
}

/// Decrements the countdown once per tick and resets the board exactly once
/// when it reaches zero.
fn spawn_countdown(shared: &Arc<Mutex<Inner>>, ct: &CancellationToken, inner: &Inner) {
    let round = inner.round;
    let steps = inner.countdown;
    let tick = inner.countdown_tick;
    if steps == 0 {
        return;
    }
    let shared = Arc::clone(shared);
    let ct = ct.clone();
    tokio::spawn(async move {
        for remaining in (0..steps).rev() {
            tokio::select! {
                _ = ct.cancelled() => return,
                _ = tokio::time::sleep(tick) => {}
            }
            let mut guard = lock_shared(&shared);
            if guard.round != round {
                return;
            }
            guard.countdown = remaining;
            if remaining == 0 {
                guard.begin_round();
            }
            guard.publish();
        }
    });
}

/// One tic-tac-toe session: a board, a score, the opponent and the timers.
///
/// Dropping the session cancels the token, so no scheduled callback can
/// mutate state afterwards.
pub struct GameSession {
    inner: Arc<Mutex<Inner>>,
    ct: CancellationToken,
    watch_rx: watch::Receiver<Snapshot>,
    _guard: DropGuard,
}

impl GameSession {
    pub fn new(config: SessionConfig, mut store: Box<dyn ScoreStore>) -> Self {
        let persisted = match store.load() {
            Ok(Some(data)) => data,
            Ok(None) => Persisted::default(),
            Err(err) => {
                warn!("failed to load saved score, starting from zero: {}", err);
                Persisted::default()
            }
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let game = TicTacToe::new();
        let snapshot = Snapshot {
            board: game.board().clone(),
            state: game.state(),
            winning_line: None,
            score: persisted.score,
            countdown: 0,
            thinking: false,
            move_count: 0,
            mode: config.mode,
            player_x: config.player_x.clone(),
            player_o: config.player_o.clone(),
        };
        let (watch_tx, watch_rx) = watch::channel(snapshot);
        let inner = Inner {
            game,
            mode: config.mode,
            player_x: config.player_x,
            player_o: config.player_o,
            score: persisted.score,
            history: persisted.history,
            countdown: 0,
            thinking: false,
            round: 0,
            rng,
            store,
            watch_tx,
            thinking_delay: config.thinking_delay,
            countdown_tick: config.countdown_tick,
            countdown_from: config.countdown_from,
        };
        let ct = CancellationToken::new();
        Self {
            inner: Arc::new(Mutex::new(inner)),
            _guard: ct.clone().drop_guard(),
            ct,
            watch_rx,
        }
    }

    /// Applies a move for the marker on turn at `cell`.
    ///
    /// Rejected (board untouched) when the game is finished, the cell is
    /// occupied or a computer move is in flight. Must be called within a
    /// tokio runtime: accepted moves may schedule timer tasks.
    pub fn make_move(&self, cell: CellIndex) -> Result<GameState, MoveRejected> {
        let mut inner = self.lock();
        if inner.thinking {
            return Err(MoveRejected::OpponentPending);
        }
        let mark = match inner.game.state() {
            GameState::Turn(mark) => mark,
            GameState::Finished(_) => return Err(GameError::GameIsFinished.into()),
        };
        let state = inner.game.apply(mark, cell)?;
        match state {
            GameState::Finished(finished) => {
                inner.finish_round(finished);
                spawn_countdown(&self.inner, &self.ct, &inner);
            }
            GameState::Turn(next) => {
                if inner.mode == GameMode::Computer && next == Mark::O {
                    schedule_computer_move(&self.inner, &self.ct, &mut inner);
                }
            }
        }
        inner.publish();
        Ok(state)
    }

    /// Starts a new game immediately, cancelling any pending countdown or
    /// computer move.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.begin_round();
        inner.publish();
    }

    /// Zeroes all score counters and persists the change. History is kept.
    pub fn reset_score(&self) {
        let mut inner = self.lock();
        inner.score = ScoreBoard::default();
        inner.save();
        inner.publish();
    }

    pub fn snapshot(&self) -> Snapshot {
        self.watch_rx.borrow().clone()
    }

    /// Channel carrying a fresh [`Snapshot`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.lock().watch_tx.subscribe()
    }

    pub fn score(&self) -> ScoreBoard {
        self.lock().score
    }

    /// Finished games, newest first, at most [`HISTORY_LIMIT`] entries.
    pub fn history(&self) -> Vec<MatchRecord> {
        self.lock().history.clone()
    }

    /// Cancels all pending timers; the session stays readable.
    pub fn shutdown(&self) {
        self.ct.cancel();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_shared(&self.inner)
    }
}
