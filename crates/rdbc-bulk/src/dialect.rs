//! Positional parameter styles per database
//!
//! - Dollar: `$1, $2, ...` (PostgreSQL)
//! - QuestionMark: `?` (MySQL, MariaDB, SQLite)
//! - AtP: `@p1, @p2, ...` (SQL Server)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::connection::DatabaseType;

/// How a driver spells positional parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStyle {
    /// `$n`
    #[default]
    Dollar,
    /// `?`
    QuestionMark,
    /// `@pn`
    AtP,
}

impl ParamStyle {
    /// Placeholder for the 1-based parameter `index`
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Dollar => format!("${}", index),
            Self::QuestionMark => "?".to_string(),
            Self::AtP => format!("@p{}", index),
        }
    }

    /// Style used by a database's native driver
    pub const fn for_database(db: DatabaseType) -> Self {
        match db {
            DatabaseType::PostgreSQL => Self::Dollar,
            DatabaseType::MySQL | DatabaseType::SQLite => Self::QuestionMark,
            DatabaseType::SqlServer => Self::AtP,
        }
    }

    /// Whether each placeholder carries its own index
    #[inline]
    pub const fn is_numbered(self) -> bool {
        !matches!(self, Self::QuestionMark)
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dollar => write!(f, "dollar"),
            Self::QuestionMark => write!(f, "question_mark"),
            Self::AtP => write!(f, "at_p"),
        }
    }
}
