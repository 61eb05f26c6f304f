//! Score and match-history persistence seam.
//!
//! The session treats storage as an external collaborator: it loads once at
//! construction and saves after every terminal state. Key scheme and on-disk
//! layout belong to the store implementation, not to the game core.

use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{FinishedState, Mark};
use crate::session::GameMode;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to access score storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored score data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Per-user win/loss/draw counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub x_wins: u32,
    pub o_wins: u32,
    pub draws: u32,
}

impl ScoreBoard {
    pub fn record(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::XWins => self.x_wins += 1,
            MatchOutcome::OWins => self.o_wins += 1,
            MatchOutcome::Draw => self.draws += 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    XWins,
    OWins,
    Draw,
}

impl From<FinishedState> for MatchOutcome {
    fn from(value: FinishedState) -> Self {
        match value {
            FinishedState::Win(Mark::X) => Self::XWins,
            FinishedState::Win(Mark::O) => Self::OWins,
            FinishedState::Draw => Self::Draw,
        }
    }
}

impl Display for MatchOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XWins => f.write_str("X wins"),
            Self::OWins => f.write_str("O wins"),
            Self::Draw => f.write_str("draw"),
        }
    }
}

/// One finished game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub finished_at: DateTime<Utc>,
    pub mode: GameMode,
    pub player_x: String,
    pub player_o: String,
    pub outcome: MatchOutcome,
    pub moves: u32,
}

/// The whole persisted document: score plus the capped history log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Persisted {
    pub score: ScoreBoard,
    #[serde(default)]
    pub history: Vec<MatchRecord>,
}

pub trait ScoreStore: Send {
    /// Returns the persisted document, or [`None`] when nothing was saved yet.
    fn load(&mut self) -> StoreResult<Option<Persisted>>;

    fn save(&mut self, data: &Persisted) -> StoreResult<()>;
}

/// In-memory store, used by tests and as a no-persistence fallback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Option<Persisted>,
}

impl ScoreStore for MemoryStore {
    fn load(&mut self) -> StoreResult<Option<Persisted>> {
        Ok(self.data.clone())
    }

    fn save(&mut self, data: &Persisted) -> StoreResult<()> {
        self.data = Some(data.clone());
        Ok(())
    }
}

/// Store that keeps one JSON document per user id under a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn for_user(dir: impl AsRef<Path>, user: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("tic_tac_toe_{}.json", user)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for JsonFileStore {
    fn load(&mut self) -> StoreResult<Option<Persisted>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&mut self, data: &Persisted) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(data)?)?;
        Ok(())
    }
}
