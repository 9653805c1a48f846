use axum::response::Response;

use super::flash::IncomingFlash;
use super::{error, views};

pub async fn home(flash: IncomingFlash) -> Response {
    let html = views::home_page(flash.message());
    flash.render(html)
}

pub async fn robots_txt() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

pub async fn not_found() -> Response {
    error::not_found()
}
