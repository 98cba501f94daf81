//! Table catalogue and the statement types shared by the schema manager and
//! the load orchestrator.

pub mod copy;
pub mod ddl;
pub mod transform;

use std::fmt;

use crate::error::{EtlError, EtlResult};

/// The seven tables owned by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    StagingEvents,
    StagingSongs,
    Songplays,
    Users,
    Songs,
    Artists,
    Time,
}

impl Table {
    /// Every table, in the order the schema manager drops and creates them.
    pub const ALL: [Table; 7] = [
        Table::StagingEvents,
        Table::StagingSongs,
        Table::Songplays,
        Table::Users,
        Table::Songs,
        Table::Artists,
        Table::Time,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::StagingEvents => "staging_events",
            Table::StagingSongs => "staging_songs",
            Table::Songplays => "songplays",
            Table::Users => "users",
            Table::Songs => "songs",
            Table::Artists => "artists",
            Table::Time => "time",
        }
    }

    pub fn is_staging(self) -> bool {
        matches!(self, Table::StagingEvents | Table::StagingSongs)
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Table::StagingEvents => STAGING_EVENTS,
            Table::StagingSongs => STAGING_SONGS,
            Table::Songplays => SONGPLAYS,
            Table::Users => USERS,
            Table::Songs => SONGS,
            Table::Artists => ARTISTS,
            Table::Time => TIME,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Varchar,
    Char,
    Int,
    BigInt,
    Numeric,
    Timestamp,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Varchar => "VARCHAR",
            SqlType::Char => "CHAR",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Numeric => "NUMERIC",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Nullable,
    NotNull,
    PrimaryKey,
    /// Auto-incrementing surrogate key starting at 0; rendering is dialect specific.
    IdentityPrimaryKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub constraint: Constraint,
}

impl Column {
    /// Whether the warehouse reports this column as nullable once created.
    pub fn is_nullable(&self) -> bool {
        matches!(self.constraint, Constraint::Nullable)
    }
}

const fn col(name: &'static str, sql_type: SqlType) -> Column {
    Column {
        name,
        sql_type,
        constraint: Constraint::Nullable,
    }
}

const fn key(name: &'static str, sql_type: SqlType) -> Column {
    Column {
        name,
        sql_type,
        constraint: Constraint::PrimaryKey,
    }
}

const fn required(name: &'static str, sql_type: SqlType) -> Column {
    Column {
        name,
        sql_type,
        constraint: Constraint::NotNull,
    }
}

// Staging column names follow the source JSON field names.
const STAGING_EVENTS: &[Column] = &[
    col("artist", SqlType::Varchar),
    col("auth", SqlType::Varchar),
    col("firstName", SqlType::Varchar),
    col("gender", SqlType::Char),
    col("itemInSession", SqlType::Int),
    col("lastName", SqlType::Varchar),
    col("length", SqlType::Numeric),
    col("level", SqlType::Varchar),
    col("location", SqlType::Varchar),
    col("method", SqlType::Varchar),
    col("page", SqlType::Varchar),
    col("registration", SqlType::Numeric),
    col("sessionId", SqlType::Int),
    col("song", SqlType::Varchar),
    col("status", SqlType::Int),
    col("ts", SqlType::BigInt),
    col("userAgent", SqlType::Varchar),
    col("userId", SqlType::Varchar),
];

const STAGING_SONGS: &[Column] = &[
    col("num_songs", SqlType::Int),
    col("artist_id", SqlType::Varchar),
    col("artist_latitude", SqlType::Numeric),
    col("artist_longitude", SqlType::Numeric),
    col("artist_location", SqlType::Varchar),
    col("artist_name", SqlType::Varchar),
    col("song_id", SqlType::Varchar),
    col("title", SqlType::Varchar),
    col("duration", SqlType::Numeric),
    col("year", SqlType::Int),
];

const SONGPLAYS: &[Column] = &[
    Column {
        name: "songplay_id",
        sql_type: SqlType::Int,
        constraint: Constraint::IdentityPrimaryKey,
    },
    required("start_time", SqlType::Timestamp),
    required("user_id", SqlType::Varchar),
    col("level", SqlType::Varchar),
    col("song_id", SqlType::Varchar),
    col("artist_id", SqlType::Varchar),
    col("session_id", SqlType::Int),
    col("location", SqlType::Varchar),
    col("user_agent", SqlType::Varchar),
];

const USERS: &[Column] = &[
    key("user_id", SqlType::Varchar),
    col("first_name", SqlType::Varchar),
    col("last_name", SqlType::Varchar),
    col("gender", SqlType::Char),
    col("level", SqlType::Varchar),
];

const SONGS: &[Column] = &[
    key("song_id", SqlType::Varchar),
    col("title", SqlType::Varchar),
    col("artist_id", SqlType::Varchar),
    col("year", SqlType::Int),
    col("duration", SqlType::Numeric),
];

const ARTISTS: &[Column] = &[
    key("artist_id", SqlType::Varchar),
    col("name", SqlType::Varchar),
    col("location", SqlType::Varchar),
    col("latitude", SqlType::Numeric),
    col("longitude", SqlType::Numeric),
];

const TIME: &[Column] = &[
    key("start_time", SqlType::Timestamp),
    col("hour", SqlType::Int),
    col("day", SqlType::Int),
    col("week", SqlType::Int),
    col("month", SqlType::Int),
    col("year", SqlType::Int),
    col("weekday", SqlType::Int),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Drop,
    Create,
    Copy,
    Insert,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Drop => "drop",
            StatementKind::Create => "create",
            StatementKind::Copy => "copy",
            StatementKind::Insert => "insert",
        })
    }
}

/// One SQL statement aimed at one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub table: Table,
    pub kind: StatementKind,
    pub sql: String,
}

impl Statement {
    pub fn new(table: Table, kind: StatementKind, sql: impl Into<String>) -> Self {
        Self {
            table,
            kind,
            sql: sql.into(),
        }
    }
}

/// Renders `value` as a single-quoted SQL string literal.
///
/// COPY takes its source path, credentials and region as literals that cannot
/// be bound as parameters. Values containing a quote, a statement terminator,
/// a backslash or a control character are rejected instead of escaped.
pub fn quote_literal(field: &str, value: &str) -> EtlResult<String> {
    if value.trim().is_empty() {
        return Err(EtlError::Config(format!("{field} is empty")));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| matches!(c, '\'' | ';' | '\\') || c.is_control())
    {
        return Err(EtlError::Config(format!(
            "{field} contains forbidden character {bad:?}"
        )));
    }
    Ok(format!("'{value}'"))
}
