use axum::{
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::{util::MapRequest, util::MapRequestLayer, Layer};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, services::ServeDir, trace::TraceLayer,
};

use crate::config::Config;
use crate::db::Repository;
use crate::omdb::OmdbClient;
use crate::web::{self, movies, pages, users, FlashKey};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn Repository>,
    pub omdb: Arc<OmdbClient>,
    pub flash_key: Arc<FlashKey>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn Repository>, omdb: OmdbClient, flash_key: FlashKey) -> Self {
        Self {
            config: Arc::new(config),
            db,
            omdb: Arc::new(omdb),
            flash_key: Arc::new(flash_key),
        }
    }
}

/// The router with paths normalized before routing.
pub type App = MapRequest<Router, fn(Request) -> Request>;

pub fn build_app(state: AppState) -> App {
    let normalize: fn(Request) -> Request = crate::middleware::normalize_path;
    MapRequestLayer::new(normalize).layer(build_router(state))
}

pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/add", get(users::add_user_form).post(users::add_user))
        .route("/add_user", get(users::add_user_form).post(users::add_user))
        .route("/users/:user_id", get(users::user_movies))
        .route("/users/:user_id/delete", post(users::delete_user));

    let movie_routes = Router::new()
        .route(
            "/users/:user_id/add_movie",
            get(movies::add_movie_form).post(movies::add_movie),
        )
        .route(
            "/users/:user_id/update_movie/:movie_id",
            get(movies::update_movie_form).post(movies::update_movie),
        )
        .route(
            "/users/:user_id/delete_movie/:movie_id",
            get(movies::delete_movie).post(movies::delete_movie),
        );

    Router::new()
        .route("/", get(pages::home))
        .route("/robots.txt", get(pages::robots_txt))
        .merge(user_routes)
        .merge(movie_routes)
        .nest_service("/static", ServeDir::new(&state.config.staticdir))
        .fallback(pages::not_found)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(CatchPanicLayer::custom(web::error::panic_response))
        .layer(axum::middleware::from_fn(web::flash::clear_on_error))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
