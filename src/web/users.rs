use axum::{extract::State, response::Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::AppResult;
use super::extract::{FormData, PathParams};
use super::flash::{self, FlashLevel, IncomingFlash};
use super::{paths, views};
use crate::db::{DbError, MovieRepo, UserRepo};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AddUserForm {
    #[serde(default)]
    pub name: String,
}

/// Names are compared and stored trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub async fn list_users(State(state): State<AppState>, flash: IncomingFlash) -> AppResult<Response> {
    let users = state.db.list_users().await?;
    debug!("Listing {} users", users.len());
    let html = views::users_page(flash.message(), &users);
    Ok(flash.render(html))
}

pub async fn user_movies(
    State(state): State<AppState>,
    PathParams(user_id): PathParams<i64>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let user = state.db.get_user(user_id).await?;
    let movies = state.db.list_movies(user.id).await?;

    if movies.is_empty() {
        info!(user_id = user.id, "No movies for user");
    } else {
        debug!(user_id = user.id, count = movies.len(), "Movies for user");
    }

    let html = views::user_movies_page(flash.message(), &user, &movies);
    Ok(flash.render(html))
}

pub async fn add_user_form(flash: IncomingFlash) -> Response {
    let html = views::add_user_page(flash.message());
    flash.render(html)
}

pub async fn add_user(
    State(state): State<AppState>,
    FormData(form): FormData<AddUserForm>,
) -> AppResult<Response> {
    let key = &state.flash_key;
    let name = normalize_name(&form.name);
    if name.is_empty() {
        return Ok(flash::redirect(key, "/users/add", FlashLevel::Error, "User name is required."));
    }

    if let Some(existing) = state.db.find_user_by_name(&name).await? {
        return Ok(redirect_to_existing(&state, existing.id, &name));
    }

    match state.db.add_user(&name).await {
        Ok(user) => {
            info!(user_id = user.id, "Added user {}", user.name);
            Ok(flash::redirect(
                key,
                "/users",
                FlashLevel::Success,
                format!("User {} added successfully", user.name),
            ))
        }
        // Lost a race against an identical request.
        Err(DbError::AlreadyExists(_)) => match state.db.find_user_by_name(&name).await? {
            Some(existing) => Ok(redirect_to_existing(&state, existing.id, &name)),
            None => Ok(flash::redirect(
                key,
                "/users",
                FlashLevel::Warning,
                format!("User '{}' already exists.", name),
            )),
        },
        Err(e) => Err(e.into()),
    }
}

fn redirect_to_existing(state: &AppState, user_id: i64, name: &str) -> Response {
    debug!(user_id = user_id, "User {} already exists", name);
    flash::redirect(
        &state.flash_key,
        &paths::user(user_id),
        FlashLevel::Warning,
        format!("User '{}' already exists. Redirecting to user's page.", name),
    )
}

pub async fn delete_user(
    State(state): State<AppState>,
    PathParams(user_id): PathParams<i64>,
) -> AppResult<Response> {
    match state.db.delete_user(user_id).await {
        Ok(()) => {
            info!(user_id = user_id, "Deleted user and their movies");
            Ok(flash::redirect(
                &state.flash_key,
                "/users",
                FlashLevel::Success,
                "User deleted successfully",
            ))
        }
        Err(DbError::NotFound(_)) => {
            warn!(user_id = user_id, "Delete of unknown user");
            Ok(flash::redirect(&state.flash_key, "/users", FlashLevel::Warning, "User not found"))
        }
        Err(e) => Err(e.into()),
    }
}
