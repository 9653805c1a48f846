use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list_users(&self) -> DbResult<Vec<User>>;
    async fn get_user(&self, id: i64) -> DbResult<User>;
    /// Case-insensitive lookup by name.
    async fn find_user_by_name(&self, name: &str) -> DbResult<Option<User>>;
    async fn add_user(&self, name: &str) -> DbResult<User>;
    /// Deletes the user and, through the foreign key, all of its movies.
    async fn delete_user(&self, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait MovieRepo: Send + Sync {
    async fn list_movies(&self, user_id: i64) -> DbResult<Vec<Movie>>;
    async fn get_movie(&self, id: i64) -> DbResult<Movie>;
    /// Case-insensitive lookup of a title within one user's list.
    async fn find_movie_by_name(&self, user_id: i64, name: &str) -> DbResult<Option<Movie>>;
    async fn add_movie(&self, movie: &NewMovie) -> DbResult<Movie>;
    async fn update_movie(&self, id: i64, update: &MovieUpdate) -> DbResult<Movie>;
    async fn delete_movie(&self, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait Repository: UserRepo + MovieRepo + Send + Sync {
    /// Waits for pooled connections to be returned and closes them.
    async fn close(&self);
}
