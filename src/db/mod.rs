//! Storage for users and their movie lists.

pub mod model;
pub mod repo;
pub mod sqlite;

pub use model::*;
pub use repo::*;
pub use sqlite::SqliteRepository;
