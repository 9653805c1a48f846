use std::cmp::Ordering;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Connection;
use tracing::{debug, info, warn};

use super::model::*;
use super::repo::*;

const SCHEMA: &str = include_str!("schema.sql");

/// Bumped whenever an upgrade step is added to `upgrade_schema`.
const SCHEMA_VERSION: i64 = 2;

/// Case-insensitive collation that folds all of Unicode, not just ASCII.
const NAME_COLLATION: &str = "UNICODE_NOCASE";

const MOVIE_COLUMNS: &str = "id, name, director, year, rating, user_id";

fn fold_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// The `CREATE TABLE` statement of `table`, upper-cased.
async fn table_ddl(conn: &mut SqliteConnection, table: &str) -> DbResult<Option<String>> {
    let sql: Option<String> = sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sql.map(|s| s.to_uppercase()))
}

fn users_is_current(ddl: &str) -> bool {
    ddl.contains("UNIQUE") && ddl.contains(NAME_COLLATION)
}

fn movies_is_current(ddl: &str) -> bool {
    ddl.contains("UNIQUE")
        && ddl.contains(NAME_COLLATION)
        && ddl.contains("ON DELETE CASCADE")
        && ddl.contains("RATING REAL")
}

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: impl AsRef<Path>) -> DbResult<Self> {
        let db_path = db_path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .collation(NAME_COLLATION, fold_case);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path.display());

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;

        if version < SCHEMA_VERSION {
            self.upgrade_schema().await?;
        }

        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        sqlx::raw_sql(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Brings tables written by an older release (or by other tools) up to
    /// the current layout: REAL ratings, cascading deletes, and unique
    /// case-folded names.
    ///
    /// Foreign keys are switched off on one connection for the duration of
    /// the rebuild, as SQLite requires for dropping a referenced table.
    async fn upgrade_schema(&self) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;

        let users = table_ddl(&mut conn, "users").await?;
        let movies = table_ddl(&mut conn, "movies").await?;
        let stale = users.as_deref().is_some_and(|ddl| !users_is_current(ddl))
            || movies.as_deref().is_some_and(|ddl| !movies_is_current(ddl));
        if !stale {
            return Ok(());
        }

        warn!("Rebuilding users and movies tables in the current layout");
        sqlx::raw_sql("PRAGMA foreign_keys = OFF").execute(&mut *conn).await?;
        let result = rebuild_tables(&mut conn, users.is_some(), movies.is_some()).await;
        sqlx::raw_sql("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
        result
    }
}

async fn rebuild_tables(conn: &mut SqliteConnection, has_users: bool, has_movies: bool) -> DbResult<()> {
    let mut tx = conn.begin().await?;

    sqlx::raw_sql("DROP INDEX IF EXISTS movies_user_id").execute(&mut *tx).await?;
    if has_users {
        sqlx::raw_sql("ALTER TABLE users RENAME TO users_old").execute(&mut *tx).await?;
    }
    if has_movies {
        sqlx::raw_sql("ALTER TABLE movies RENAME TO movies_old").execute(&mut *tx).await?;
    }
    sqlx::raw_sql(SCHEMA).execute(&mut *tx).await?;

    // Names that only differ in case collapse onto the lowest id.
    if has_users {
        let copied = sqlx::query("INSERT OR IGNORE INTO users (id, name) SELECT id, name FROM users_old ORDER BY id")
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("copying users: {}", e)))?;
        debug!("Copied {} users", copied.rows_affected());
    }
    if has_users && has_movies {
        let copied = sqlx::query(
            "INSERT OR IGNORE INTO movies (id, name, director, year, rating, user_id)
             SELECT m.id, m.name, m.director, m.year, CAST(m.rating AS REAL), kept.id
             FROM movies_old m
             JOIN users_old u ON u.id = m.user_id
             JOIN users kept ON kept.name = u.name
             ORDER BY m.id",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::Migration(format!("copying movies: {}", e)))?;
        debug!("Copied {} movies", copied.rows_affected());
    }

    if has_movies {
        sqlx::raw_sql("DROP TABLE movies_old").execute(&mut *tx).await?;
    }
    if has_users {
        sqlx::raw_sql("DROP TABLE users_old").execute(&mut *tx).await?;
    }

    let violations = sqlx::query("PRAGMA foreign_key_check").fetch_all(&mut *tx).await?;
    if !violations.is_empty() {
        return Err(DbError::Migration(format!(
            "{} foreign key violations after rebuild",
            violations.len()
        )));
    }

    tx.commit().await?;
    Ok(())
}

/// Maps constraint violations on insert/update to domain errors.
fn constraint_error(e: sqlx::Error, what: impl FnOnce() -> String) -> DbError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DbError::AlreadyExists(what()),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => DbError::NotFound(what()),
        _ => DbError::Sqlx(e),
    }
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn list_users(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT id, name FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn get_user(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, name FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", id)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn find_user_by_name(&self, name: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn add_user(&self, name: &str) -> DbResult<User> {
        let user = sqlx::query_as::<_, User>("INSERT INTO users (name) VALUES (?) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| constraint_error(e, || format!("User {}", name)))?;
        debug!(user_id = user.id, "Added user {}", user.name);
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("User not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl MovieRepo for SqliteRepository {
    async fn list_movies(&self, user_id: i64) -> DbResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies WHERE user_id = ? ORDER BY name",
            MOVIE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn get_movie(&self, id: i64) -> DbResult<Movie> {
        sqlx::query_as::<_, Movie>(&format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("Movie not found: {}", id)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn find_movie_by_name(&self, user_id: i64, name: &str) -> DbResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies WHERE user_id = ? AND name = ?",
            MOVIE_COLUMNS
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn add_movie(&self, movie: &NewMovie) -> DbResult<Movie> {
        let stored = sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (name, director, year, rating, user_id)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {}",
            MOVIE_COLUMNS
        ))
        .bind(&movie.name)
        .bind(&movie.director)
        .bind(movie.year)
        .bind(movie.rating)
        .bind(movie.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, || format!("Movie {} for user {}", movie.name, movie.user_id)))?;
        debug!(movie_id = stored.id, user_id = stored.user_id, "Added movie {}", stored.name);
        Ok(stored)
    }

    async fn update_movie(&self, id: i64, update: &MovieUpdate) -> DbResult<Movie> {
        sqlx::query_as::<_, Movie>(&format!(
            "UPDATE movies SET
                name = COALESCE(?, name),
                director = COALESCE(?, director),
                year = COALESCE(?, year),
                rating = COALESCE(?, rating)
             WHERE id = ?
             RETURNING {}",
            MOVIE_COLUMNS
        ))
        .bind(&update.name)
        .bind(&update.director)
        .bind(update.year)
        .bind(update.rating)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| constraint_error(e, || format!("Movie {}", update.name.as_deref().unwrap_or_default())))?
        .ok_or_else(|| DbError::NotFound(format!("Movie not found: {}", id)))
    }

    async fn delete_movie(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Movie not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open() -> (tempfile::TempDir, SqliteRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepository::new(dir.path().join("test.db")).await.unwrap();
        (dir, repo)
    }

    fn new_movie(user_id: i64, name: &str) -> NewMovie {
        NewMovie {
            user_id,
            name: name.to_string(),
            director: Some("Christopher Nolan".to_string()),
            year: Some(2010),
            rating: Some(8.8),
        }
    }

    #[tokio::test]
    async fn test_add_and_find_user_case_insensitive() {
        let (_dir, repo) = open().await;
        let alice = repo.add_user("alice").await.unwrap();

        let found = repo.find_user_by_name("ALICE").await.unwrap();
        assert_eq!(found, Some(alice.clone()));
        assert!(matches!(repo.add_user("Alice").await, Err(DbError::AlreadyExists(_))));
        assert_eq!(repo.list_users().await.unwrap(), vec![alice]);
    }

    #[tokio::test]
    async fn test_delete_user_cascades_to_movies() {
        let (_dir, repo) = open().await;
        let alice = repo.add_user("alice").await.unwrap();
        let bob = repo.add_user("bob").await.unwrap();
        let inception = repo.add_movie(&new_movie(alice.id, "Inception")).await.unwrap();
        repo.add_movie(&new_movie(bob.id, "Inception")).await.unwrap();

        repo.delete_user(alice.id).await.unwrap();

        assert!(repo.get_movie(inception.id).await.unwrap_err().is_not_found());
        assert!(repo.list_movies(alice.id).await.unwrap().is_empty());
        assert_eq!(repo.list_movies(bob.id).await.unwrap().len(), 1);
        assert!(repo.delete_user(alice.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_title_is_rejected_by_store() {
        let (_dir, repo) = open().await;
        let alice = repo.add_user("alice").await.unwrap();
        repo.add_movie(&new_movie(alice.id, "Inception")).await.unwrap();

        let err = repo.add_movie(&new_movie(alice.id, "inception")).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));
        assert_eq!(repo.list_movies(alice.id).await.unwrap().len(), 1);
        assert!(repo.find_movie_by_name(alice.id, "INCEPTION").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_movie_for_missing_user() {
        let (_dir, repo) = open().await;
        let err = repo.add_movie(&new_movie(42, "Inception")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (_dir, repo) = open().await;
        let alice = repo.add_user("alice").await.unwrap();
        let movie = repo.add_movie(&new_movie(alice.id, "Inception")).await.unwrap();

        let update = MovieUpdate {
            rating: Some(9.1),
            ..Default::default()
        };
        let updated = repo.update_movie(movie.id, &update).await.unwrap();

        assert_eq!(updated.rating, Some(9.1));
        assert_eq!(updated.name, "Inception");
        assert_eq!(updated.director.as_deref(), Some("Christopher Nolan"));
        assert_eq!(updated.year, Some(2010));
        assert_eq!(repo.get_movie(movie.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_movie_signal_not_found() {
        let (_dir, repo) = open().await;
        let update = MovieUpdate {
            name: Some("Tenet".to_string()),
            ..Default::default()
        };
        assert!(repo.update_movie(7, &update).await.unwrap_err().is_not_found());
        assert!(repo.delete_movie(7).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_non_ascii_titles_compare_case_insensitively() {
        let (_dir, repo) = open().await;
        let alice = repo.add_user("alice").await.unwrap();
        repo.add_movie(&new_movie(alice.id, "Amélie")).await.unwrap();

        assert!(repo.find_movie_by_name(alice.id, "AMÉLIE").await.unwrap().is_some());
        let err = repo.add_movie(&new_movie(alice.id, "AMÉLIE")).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));
    }

    /// Creates a database with `sql` as written by an older release.
    async fn legacy_db(sql: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::raw_sql(sql).execute(&pool).await.unwrap();
        pool.close().await;
        (dir, path)
    }

    #[tokio::test]
    async fn test_integer_rating_column_is_upgraded() {
        let (_dir, path) = legacy_db(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50) NOT NULL);
             CREATE TABLE movies (
                id INTEGER PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                director VARCHAR(100),
                year INTEGER,
                rating INTEGER,
                user_id INTEGER NOT NULL REFERENCES users(id));
             INSERT INTO users (id, name) VALUES (1, 'alice');
             INSERT INTO movies (id, name, director, year, rating, user_id)
                VALUES (1, 'Inception', 'Christopher Nolan', 2010, 9, 1);",
        )
        .await;

        let repo = SqliteRepository::new(&path).await.unwrap();
        let movie = repo.get_movie(1).await.unwrap();
        assert_eq!(movie.rating, Some(9.0));

        let updated = repo
            .update_movie(1, &MovieUpdate { rating: Some(8.8), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.rating, Some(8.8));
    }

    #[tokio::test]
    async fn test_float_rating_tables_gain_cascade_and_unique_names() {
        let (_dir, path) = legacy_db(
            "CREATE TABLE users (
                id INTEGER NOT NULL,
                name VARCHAR(50) NOT NULL,
                PRIMARY KEY (id));
             CREATE TABLE movies (
                id INTEGER NOT NULL,
                name VARCHAR(100) NOT NULL,
                director VARCHAR(100),
                year INTEGER,
                rating FLOAT,
                user_id INTEGER NOT NULL,
                PRIMARY KEY (id),
                FOREIGN KEY(user_id) REFERENCES users (id));
             INSERT INTO users (id, name) VALUES (1, 'alice'), (2, 'bob'), (3, 'Alice');
             INSERT INTO movies (id, name, director, year, rating, user_id) VALUES
                (1, 'Inception', 'Christopher Nolan', 2010, 8.8, 1),
                (2, 'Tenet', 'Christopher Nolan', 2020, 7.3, 3),
                (3, 'Inception', 'Christopher Nolan', 2010, 8.8, 2);",
        )
        .await;

        let repo = SqliteRepository::new(&path).await.unwrap();

        // The second 'Alice' is folded into the first, along with her movies.
        let users = repo.list_users().await.unwrap();
        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(repo.get_movie(2).await.unwrap().user_id, 1);
        assert!(matches!(repo.add_user("ALICE").await, Err(DbError::AlreadyExists(_))));

        repo.delete_user(1).await.unwrap();
        assert!(repo.get_movie(1).await.unwrap_err().is_not_found());
        assert!(repo.get_movie(2).await.unwrap_err().is_not_found());
        assert_eq!(repo.list_movies(2).await.unwrap().len(), 1);
        repo.close().await;

        // A second open finds nothing left to do.
        let repo = SqliteRepository::new(&path).await.unwrap();
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
        assert_eq!(repo.get_movie(3).await.unwrap().rating, Some(8.8));
    }
}
