//! Database layer for the Ringdesk platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and the schema for call sessions, transcript
//! turns, the append-only call event log, and the notification outbox.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single-server call desk needs no external
//!   database process. WAL allows concurrent readers with a single writer,
//!   which matches the one-webhook-at-a-time-per-call access pattern.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management; handlers borrow a connection per event.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the server and cannot drift
//!   from the code that depends on it.

mod migrations;
mod pool;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool, DbRuntimeSettings};
