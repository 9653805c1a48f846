//! One-shot status messages carried across a redirect in a signed cookie.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::server::AppState;

pub const FLASH_COOKIE: &str = "moviweb_flash";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(FlashLevel::Success),
            "warning" => Some(FlashLevel::Warning),
            "error" => Some(FlashLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

/// HMAC key for flash cookies.
#[derive(Clone)]
pub struct FlashKey {
    key: Vec<u8>,
}

impl FlashKey {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    /// A random key, valid for the lifetime of this process only.
    pub fn generate() -> Self {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self { key }
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        mac
    }

    /// Cookie value: `<hex hmac>.<urlencoded "level:text">`.
    pub fn encode(&self, msg: &FlashMessage) -> String {
        let payload = urlencoding::encode(&format!("{}:{}", msg.level.as_str(), msg.text)).into_owned();
        let sig = hex::encode(self.mac(&payload).finalize().into_bytes());
        format!("{}.{}", sig, payload)
    }

    pub fn decode(&self, value: &str) -> Option<FlashMessage> {
        let (sig, payload) = value.split_once('.')?;
        let sig = hex::decode(sig).ok()?;
        self.mac(payload).verify_slice(&sig).ok()?;

        let decoded = urlencoding::decode(payload).ok()?;
        let (level, text) = decoded.split_once(':')?;
        Some(FlashMessage {
            level: FlashLevel::parse(level)?,
            text: text.to_string(),
        })
    }
}

fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

fn set_cookie(value: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, value)
}

fn clear_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", FLASH_COOKIE)
}

/// `303 See Other` to `to`, carrying a flash message for the next page.
pub fn redirect(key: &FlashKey, to: &str, level: FlashLevel, text: impl Into<String>) -> Response {
    let msg = FlashMessage {
        level,
        text: text.into(),
    };
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, to.to_string()),
            (header::SET_COOKIE, set_cookie(&key.encode(&msg))),
        ],
    )
        .into_response()
}

/// The flash cookie of the current request, if any.
///
/// Rendering a page through [`IncomingFlash::render`] consumes the message.
#[derive(Debug, Default)]
pub struct IncomingFlash {
    message: Option<FlashMessage>,
    present: bool,
}

impl IncomingFlash {
    pub fn message(&self) -> Option<&FlashMessage> {
        self.message.as_ref()
    }

    pub fn render(self, html: String) -> Response {
        if self.present {
            ([(header::SET_COOKIE, clear_cookie())], Html(html)).into_response()
        } else {
            Html(html).into_response()
        }
    }
}

/// Error pages are rendered without a handler's `IncomingFlash`, so any
/// pending message is dropped here instead of leaking onto the next page.
pub async fn clear_on_error(req: Request, next: Next) -> Response {
    let had_flash = read_cookie(req.headers(), FLASH_COOKIE).is_some_and(|v| !v.is_empty());
    let mut response = next.run(req).await;

    let status = response.status();
    if had_flash
        && (status.is_client_error() || status.is_server_error())
        && !response.headers().contains_key(header::SET_COOKIE)
    {
        if let Ok(value) = HeaderValue::from_str(&clear_cookie()) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

#[async_trait]
impl FromRequestParts<AppState> for IncomingFlash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookie = read_cookie(&parts.headers, FLASH_COOKIE).filter(|v| !v.is_empty());
        Ok(IncomingFlash {
            message: cookie.and_then(|v| state.flash_key.decode(v)),
            present: cookie.is_some(),
        })
    }
}
