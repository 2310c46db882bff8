//! Document index implementations.

mod sqlite;

pub use sqlite::SqliteChunkIndex;
