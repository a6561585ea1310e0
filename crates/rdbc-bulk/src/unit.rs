//! Units of work dispatched by the bulk writer
//!
//! A unit is one page (bulk statement) or one row (per-row strategies).
//! Each unit moves through `Pending -> Running -> Succeeded | Failed`.

use parking_lot::Mutex;
use std::fmt;

/// What a unit of work covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A page of rows compiled into one statement
    Page,
    /// A single row compiled into its own statement
    Row,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Row => write!(f, "row"),
        }
    }
}

/// Lifecycle state of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitState {
    /// Not started yet
    #[default]
    Pending,
    /// Holding a worker slot and executing
    Running,
    /// Finished without error
    Succeeded,
    /// Finished (or rejected at compile time) with an error
    Failed,
}

impl UnitState {
    /// Whether the unit has reached a final state
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Shared per-unit state table
#[derive(Debug)]
pub struct UnitTracker {
    states: Mutex<Vec<UnitState>>,
}

impl UnitTracker {
    /// Create a tracker with `count` pending units
    pub fn new(count: usize) -> Self {
        Self {
            states: Mutex::new(vec![UnitState::Pending; count]),
        }
    }

    /// Number of tracked units
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    /// Whether no units are tracked
    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }

    /// Get the state of a unit
    pub fn state(&self, index: usize) -> Option<UnitState> {
        self.states.lock().get(index).copied()
    }

    /// Mark a unit as running
    pub fn start(&self, index: usize) {
        self.set(index, UnitState::Running);
    }

    /// Mark a unit as succeeded
    pub fn succeed(&self, index: usize) {
        self.set(index, UnitState::Succeeded);
    }

    /// Mark a unit as failed
    pub fn fail(&self, index: usize) {
        self.set(index, UnitState::Failed);
    }

    /// Count units in the given state
    pub fn count(&self, state: UnitState) -> usize {
        self.states.lock().iter().filter(|s| **s == state).count()
    }

    /// First unit that has not reached a final state
    pub fn first_unfinished(&self) -> Option<usize> {
        self.states.lock().iter().position(|s| !s.is_terminal())
    }

    fn set(&self, index: usize, state: UnitState) {
        if let Some(slot) = self.states.lock().get_mut(index) {
            *slot = state;
        }
    }
}
