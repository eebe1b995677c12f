//! SQLite backend for the Pacta contract store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Multi-statement writes
//! (a mutation plus its audit event) run inside explicit transactions
//! within a single connection call.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
