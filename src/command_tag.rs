//! Command completion tags.

use std::fmt;

/// The server's completion summary for one statement (e.g. `INSERT 0 1`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommandTag(String);

impl CommandTag {
    /// Wrap a raw tag string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The raw tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The command word (`SELECT`, `INSERT`, `CREATE`, ...).
    pub fn command(&self) -> &str {
        self.0.split(' ').next().unwrap_or_default()
    }

    /// Number of rows affected, for commands that report one.
    ///
    /// Returns 0 for utility commands such as `CREATE TABLE` and for an
    /// empty query.
    pub fn rows_affected(&self) -> u64 {
        match self.command() {
            "INSERT" | "UPDATE" | "DELETE" | "SELECT" | "MERGE" | "MOVE" | "FETCH" | "COPY" => self
                .0
                .rsplit(' ')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Whether this is an `INSERT` tag.
    pub fn is_insert(&self) -> bool {
        self.command() == "INSERT"
    }

    /// Whether this is a `SELECT` tag.
    pub fn is_select(&self) -> bool {
        self.command() == "SELECT"
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}
