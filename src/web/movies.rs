use axum::{extract::State, response::Response};
use serde::Deserialize;
use tracing::{info, warn};

use super::error::AppResult;
use super::extract::{FormData, PathParams};
use super::flash::{self, FlashLevel, IncomingFlash};
use super::{paths, views};
use crate::db::{DbError, Movie, MovieRepo, MovieUpdate, NewMovie, UserRepo};
use crate::omdb::validate::{self, ValidationError};
use crate::server::AppState;

const DUPLICATE_MOVIE: &str = "Movie already exists for this user.";
const MOVIE_NOT_FOUND: &str = "Movie not found.";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddMode {
    /// Fill in director, year and rating from OMDb.
    #[default]
    Lookup,
    /// Use the fields as submitted.
    Manual,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: AddMode,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl MovieForm {
    /// Fields present in the form, validated. Blank fields are `None`.
    pub fn to_update(&self, current_year: i32) -> Result<MovieUpdate, ValidationError> {
        Ok(MovieUpdate {
            name: non_blank(&self.name).map(str::to_string),
            director: non_blank(&self.director).map(str::to_string),
            year: non_blank(&self.year)
                .map(|y| validate::parse_year(y, current_year))
                .transpose()?,
            rating: non_blank(&self.rating).map(validate::parse_rating).transpose()?,
        })
    }
}

/// The movie, provided it exists and belongs to `user_id`.
async fn owned_movie(state: &AppState, user_id: i64, movie_id: i64) -> AppResult<Option<Movie>> {
    match state.db.get_movie(movie_id).await {
        Ok(movie) if movie.user_id == user_id => Ok(Some(movie)),
        Ok(_) => {
            warn!(user_id = user_id, movie_id = movie_id, "Movie belongs to another user");
            Ok(None)
        }
        Err(DbError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn add_movie_form(
    State(state): State<AppState>,
    PathParams(user_id): PathParams<i64>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let user = state.db.get_user(user_id).await?;
    let html = views::add_movie_page(flash.message(), &user);
    Ok(flash.render(html))
}

pub async fn add_movie(
    State(state): State<AppState>,
    PathParams(user_id): PathParams<i64>,
    FormData(form): FormData<MovieForm>,
) -> AppResult<Response> {
    let user = state.db.get_user(user_id).await?;
    let key = &state.flash_key;
    let user_page = paths::user(user.id);

    let name = match non_blank(&form.name) {
        Some(name) => name,
        None => return Ok(flash::redirect(key, &user_page, FlashLevel::Error, "Movie name is required.")),
    };

    if state.db.find_movie_by_name(user.id, name).await?.is_some() {
        return Ok(flash::redirect(key, &user_page, FlashLevel::Error, DUPLICATE_MOVIE));
    }

    let current_year = validate::current_year();
    let movie = match form.mode {
        AddMode::Lookup => match state.omdb.fetch_details(name, current_year).await {
            Ok(details) => NewMovie {
                user_id: user.id,
                name: name.to_string(),
                director: Some(details.director),
                year: Some(details.year),
                rating: Some(details.rating),
            },
            Err(e) => {
                warn!(user_id = user.id, title = name, error = %e, "OMDb lookup rejected");
                return Ok(flash::redirect(key, &user_page, FlashLevel::Error, e.user_message()));
            }
        },
        AddMode::Manual => match form.to_update(current_year) {
            Ok(fields) => NewMovie {
                user_id: user.id,
                name: name.to_string(),
                director: fields.director,
                year: fields.year,
                rating: fields.rating,
            },
            Err(e) => {
                return Ok(flash::redirect(key, &paths::add_movie(user.id), FlashLevel::Error, e.to_string()));
            }
        },
    };

    match state.db.add_movie(&movie).await {
        Ok(stored) => {
            info!(user_id = user.id, movie_id = stored.id, "Added movie {}", stored.name);
            Ok(flash::redirect(key, &user_page, FlashLevel::Success, "Movie added successfully"))
        }
        Err(DbError::AlreadyExists(_)) => Ok(flash::redirect(key, &user_page, FlashLevel::Error, DUPLICATE_MOVIE)),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_movie_form(
    State(state): State<AppState>,
    PathParams((user_id, movie_id)): PathParams<(i64, i64)>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    match owned_movie(&state, user_id, movie_id).await? {
        Some(movie) => {
            let html = views::update_movie_page(flash.message(), user_id, &movie);
            Ok(flash.render(html))
        }
        None => Ok(flash::redirect(
            &state.flash_key,
            &paths::user(user_id),
            FlashLevel::Error,
            MOVIE_NOT_FOUND,
        )),
    }
}

pub async fn update_movie(
    State(state): State<AppState>,
    PathParams((user_id, movie_id)): PathParams<(i64, i64)>,
    FormData(form): FormData<MovieForm>,
) -> AppResult<Response> {
    let key = &state.flash_key;
    let user_page = paths::user(user_id);
    let form_page = paths::update_movie(user_id, movie_id);

    let movie = match owned_movie(&state, user_id, movie_id).await? {
        Some(movie) => movie,
        None => return Ok(flash::redirect(key, &user_page, FlashLevel::Error, MOVIE_NOT_FOUND)),
    };

    let update = match form.to_update(validate::current_year()) {
        Ok(update) => update,
        Err(e) => return Ok(flash::redirect(key, &form_page, FlashLevel::Error, e.to_string())),
    };

    if let Some(ref name) = update.name {
        if let Some(other) = state.db.find_movie_by_name(user_id, name).await? {
            if other.id != movie.id {
                return Ok(flash::redirect(key, &form_page, FlashLevel::Error, DUPLICATE_MOVIE));
            }
        }
    }

    match state.db.update_movie(movie.id, &update).await {
        Ok(updated) => {
            info!(user_id = user_id, movie_id = updated.id, "Updated movie {}", updated.name);
            Ok(flash::redirect(key, &user_page, FlashLevel::Success, "Movie updated successfully"))
        }
        Err(DbError::NotFound(_)) => Ok(flash::redirect(key, &user_page, FlashLevel::Error, MOVIE_NOT_FOUND)),
        Err(DbError::AlreadyExists(_)) => Ok(flash::redirect(key, &form_page, FlashLevel::Error, DUPLICATE_MOVIE)),
        Err(e) => Err(e.into()),
    }
}

/// Not-found and owned-by-someone-else are reported identically.
pub async fn delete_movie(
    State(state): State<AppState>,
    PathParams((user_id, movie_id)): PathParams<(i64, i64)>,
) -> AppResult<Response> {
    let key = &state.flash_key;
    let user_page = paths::user(user_id);

    let deleted = match owned_movie(&state, user_id, movie_id).await? {
        Some(movie) => match state.db.delete_movie(movie.id).await {
            Ok(()) => true,
            Err(DbError::NotFound(_)) => false,
            Err(e) => return Err(e.into()),
        },
        None => false,
    };

    if deleted {
        info!(user_id = user_id, movie_id = movie_id, "Deleted movie");
        Ok(flash::redirect(key, &user_page, FlashLevel::Success, "Movie deleted successfully."))
    } else {
        Ok(flash::redirect(key, &user_page, FlashLevel::Error, "Movie not found or unauthorized."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, director: &str, year: &str, rating: &str) -> MovieForm {
        MovieForm {
            name: Some(name.to_string()),
            mode: AddMode::Manual,
            director: Some(director.to_string()),
            year: Some(year.to_string()),
            rating: Some(rating.to_string()),
        }
    }

    #[test]
    fn test_blank_fields_are_left_out() {
        let update = form("  ", "", "", "7.5").to_update(2024).unwrap();
        assert_eq!(
            update,
            MovieUpdate {
                rating: Some(7.5),
                ..Default::default()
            }
        );
        assert_eq!(MovieForm::default().to_update(2024), Ok(MovieUpdate::default()));
    }

    #[test]
    fn test_invalid_fields_are_rejected() {
        assert_eq!(
            form("Tenet", "", "1850", "").to_update(2024),
            Err(ValidationError::YearRange { year: 1850, max: 2024 })
        );
        assert!(matches!(
            form("Tenet", "", "", "great").to_update(2024),
            Err(ValidationError::RatingFormat(_))
        ));
    }
}
