pub mod error;
pub mod extract;
pub mod flash;
pub mod movies;
pub mod pages;
pub mod users;
pub mod views;

pub use error::{AppError, AppResult};
pub use extract::{FormData, PathParams};
pub use flash::{FlashKey, FlashLevel, FlashMessage, IncomingFlash};

/// URL builders for the routes in `server::build_router`.
pub mod paths {
    pub fn user(user_id: i64) -> String {
        format!("/users/{}", user_id)
    }

    pub fn delete_user(user_id: i64) -> String {
        format!("/users/{}/delete", user_id)
    }

    pub fn add_movie(user_id: i64) -> String {
        format!("/users/{}/add_movie", user_id)
    }

    pub fn update_movie(user_id: i64, movie_id: i64) -> String {
        format!("/users/{}/update_movie/{}", user_id, movie_id)
    }

    pub fn delete_movie(user_id: i64, movie_id: i64) -> String {
        format!("/users/{}/delete_movie/{}", user_id, movie_id)
    }
}
