use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub name: String,
    pub director: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub user_id: i64,
}

/// A movie that has not been stored yet.
#[derive(Debug, Clone, Default)]
pub struct NewMovie {
    pub user_id: i64,
    pub name: String,
    pub director: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
}

/// Partial update of a movie. Fields left at `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieUpdate {
    pub name: Option<String>,
    pub director: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Schema upgrade failed: {0}")]
    Migration(String),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

pub type DbResult<T> = Result<T, DbError>;
