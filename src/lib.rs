//! rowkeep - typed record persistence over embedded SQLite
//!
//! This library crate exposes the command-line tool's building blocks for
//! integration testing. The persistence layer itself lives in `rowkeep-db`.

pub mod commands;
pub mod config;

pub use rowkeep_common::{Error, ErrorKind};
pub use rowkeep_db::{RecordBinding, RecordManager, SelectQuery, SqliteStore, Store};
