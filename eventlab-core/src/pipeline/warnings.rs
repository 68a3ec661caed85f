//! Append-only log of per-ticker failures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Pipeline step at which a ticker was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Window,
    Fetch,
    Alignment,
    Commit,
    /// The job itself panicked.
    Task,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Window => "window",
            Stage::Fetch => "fetch",
            Stage::Alignment => "alignment",
            Stage::Commit => "commit",
            Stage::Task => "task",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub ticker: String,
    pub stage: Stage,
    pub message: String,
}

impl Warning {
    pub fn new(ticker: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.ticker, self.message)
    }
}

/// Thread-safe warning sink with its own lock, independent of the store.
#[derive(Debug, Default)]
pub struct WarningLog {
    entries: Mutex<Vec<Warning>>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, warning: Warning) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the entries in append order.
    pub fn snapshot(&self) -> Vec<Warning> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_inner(self) -> Vec<Warning> {
        self.entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
