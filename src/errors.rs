//! State Relay Error Hierarchy
//!
//! Errors are grouped by the layer that raised them: OS primitives backing the
//! reactor, the shared state store, configuration, and caller misuse.
//!
//! Logical empty states (no data ready, select timeout, empty channel) are
//! never errors. They are reported through [`crate::Readiness`],
//! [`crate::SelectOutcome`] and `Option` return values.

use std::io;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// OS primitive failures (timerfd, eventfd, poll)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Shared state store failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration source or parsing failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Semantically invalid configuration values
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Programming mistakes by the caller
    #[error(transparent)]
    Usage(#[from] UsageError),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Failed to create timerfd: {source}")]
    TimerCreate { source: io::Error },

    #[error("Failed to arm timerfd {fd}: {source}")]
    TimerArm { fd: i32, source: io::Error },

    #[error("Failed to read timerfd {fd}: {source}")]
    TimerRead { fd: i32, source: io::Error },

    /// A counter read returned fewer bytes than the 8-byte counter
    #[error("Short read on fd {fd}: expected {expected} bytes, got {actual}")]
    ShortRead {
        fd: i32,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to create eventfd: {source}")]
    EventCreate { source: io::Error },

    #[error("Failed to signal eventfd {fd}: {source}")]
    EventWrite { fd: i32, source: io::Error },

    #[error("Failed to read eventfd {fd}: {source}")]
    EventRead { fd: i32, source: io::Error },

    /// Failure of the reactor's wait primitive
    #[error("poll() failed over {nfds} handles: {source}")]
    Poll { nfds: usize, source: io::Error },

    /// A registered handle is not an open descriptor
    #[error("poll() reported fd {fd} as not open")]
    InvalidHandle { fd: i32 },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Operation against a key holding the wrong kind of value
    #[error("Operation against key {key} holding the wrong kind of value")]
    WrongType { key: String },

    /// Store connection dropped
    #[error("Store connection lost: {0}")]
    ConnectionLost(String),
}

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// `pop` called while no tuple is buffered
    #[error("pop on table {table} with no buffered entry")]
    EmptyPop { table: String },

    /// Database configuration accessed before `initialize`
    #[error("Database config is not initialized")]
    NotInitialized,

    /// Database configuration initialized twice
    #[error("Database config is already initialized")]
    AlreadyInitialized,

    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    #[error("Unknown database id: {0}")]
    UnknownDatabaseId(u32),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// `select` without timeout on an empty reactor would never return
    #[error("select with no registered selectable and no timeout")]
    NothingToSelect,
}
