//! Persistence layer: libSQL-backed storage for the directory and sessions.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;
