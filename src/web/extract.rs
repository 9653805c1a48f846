//! `Path` and `Form` extractors whose rejections render an error page.

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Form,
};
use serde::de::DeserializeOwned;

use super::error::AppError;

/// Path parameters. A segment that does not parse gets the 404 page.
#[derive(Debug)]
pub struct PathParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(params) = axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(PathParams(params))
    }
}

/// A url-encoded form body. A malformed body gets the 400 page.
#[derive(Debug)]
pub struct FormData<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for FormData<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(form) = Form::<T>::from_request(req, state).await?;
        Ok(FormData(form))
    }
}
