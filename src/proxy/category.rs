//! Metrics categories used by the backend proxies.
//!
//! Every proxied operation is logged into [`CATEGORY_ALL`] plus exactly one
//! class category. The metrics store itself treats categories as opaque keys.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CATEGORY_ALL: &str = "ALL";
pub const CATEGORY_DQL: &str = "DQL";
pub const CATEGORY_DML: &str = "DML";
pub const CATEGORY_DDL: &str = "DDL";
pub const CATEGORY_OTHER: &str = "OTHER";

/// Leading keyword of a statement, skipping whitespace, comments and
/// opening parentheses.
static LEADING_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s+|--[^\n]*(?:\n|$)|/\*(?s:.*?)\*/|\()*([A-Za-z]+)")
        .expect("Failed to compile leading keyword regex")
});

/// Operation class of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    /// Reads: queries, lookups, scans.
    Query,
    /// Writes: inserts, updates, deletes.
    Mutation,
    /// Schema and table management.
    Schema,
    Other,
}

impl CommandClass {
    /// Category name of this class.
    pub fn category(self) -> &'static str {
        match self {
            Self::Query => CATEGORY_DQL,
            Self::Mutation => CATEGORY_DML,
            Self::Schema => CATEGORY_DDL,
            Self::Other => CATEGORY_OTHER,
        }
    }

    /// Categories a command of this class is logged into.
    pub fn categories(self) -> [&'static str; 2] {
        [CATEGORY_ALL, self.category()]
    }
}

/// Classify a SQL statement by its leading keyword.
pub fn classify_sql(statement: &str) -> CommandClass {
    let Some(keyword) = LEADING_KEYWORD
        .captures(statement)
        .and_then(|caps| caps.get(1))
    else {
        return CommandClass::Other;
    };

    match keyword.as_str().to_ascii_uppercase().as_str() {
        "SELECT" | "WITH" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "VALUES" | "TABLE" => {
            CommandClass::Query
        }
        "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "MERGE" | "UPSERT" => CommandClass::Mutation,
        "CREATE" | "ALTER" | "DROP" | "TRUNCATE" | "RENAME" | "COMMENT" => CommandClass::Schema,
        _ => CommandClass::Other,
    }
}
