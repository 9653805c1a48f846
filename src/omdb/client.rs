use std::time::Duration;

use tracing::{debug, warn};

use super::types::*;
use super::validate::{self, ValidationError};
use crate::config::OmdbConfig;

#[derive(Debug, thiserror::Error)]
pub enum OmdbError {
    #[error("OMDb API key is not configured")]
    NotConfigured,
    #[error("OMDb request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("OMDb returned HTTP {0}")]
    Status(u16),
    #[error("Title not found in OMDb: {0}")]
    NotFound(String),
    #[error("Invalid OMDb data: {0}")]
    Invalid(#[from] ValidationError),
}

impl OmdbError {
    /// The message shown to the user when a lookup aborts an add.
    pub fn user_message(&self) -> String {
        match self {
            OmdbError::NotConfigured => "Movie lookup is not configured.".to_string(),
            OmdbError::Request(_) | OmdbError::Status(_) => {
                "Error fetching movie details from OMDb. Please try again later.".to_string()
            }
            OmdbError::NotFound(_) => {
                "Movie not found in OMDb. Ensure the title is spelled correctly or try another title."
                    .to_string()
            }
            OmdbError::Invalid(ValidationError::YearFormat(_)) => {
                "Invalid year format received from OMDb.".to_string()
            }
            OmdbError::Invalid(ValidationError::RatingFormat(_)) => {
                "Invalid rating format received from OMDb.".to_string()
            }
            OmdbError::Invalid(e) => e.to_string(),
        }
    }
}

/// Client for the OMDb title lookup API.
///
/// Each call issues exactly one request; nothing is retried or cached.
#[derive(Clone)]
pub struct OmdbClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl OmdbClient {
    pub fn new(config: &OmdbConfig) -> Result<Self, OmdbError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
            api_key: config.apikey.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Fetch the raw OMDb record for `title`.
    pub async fn lookup(&self, title: &str) -> Result<OmdbResponse, OmdbError> {
        let api_key = self.api_key.as_deref().ok_or(OmdbError::NotConfigured)?;

        debug!(title = title, "OMDb lookup");

        let response = self
            .http
            .get(&self.url)
            .query(&[("apikey", api_key), ("t", title)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(title = title, status = status.as_u16(), "OMDb lookup failed");
            return Err(OmdbError::Status(status.as_u16()));
        }

        let body: OmdbResponse = response.json().await?;
        if !body.is_success() {
            debug!(title = title, error = ?body.error, "OMDb has no match");
            return Err(OmdbError::NotFound(title.to_string()));
        }

        Ok(body)
    }

    /// Look up `title` and validate year and rating against the domain bounds.
    pub async fn fetch_details(&self, title: &str, current_year: i32) -> Result<MovieDetails, OmdbError> {
        let record = self.lookup(title).await?;
        let details = validate_record(&record, current_year)?;
        Ok(details)
    }
}

pub fn validate_record(record: &OmdbResponse, current_year: i32) -> Result<MovieDetails, ValidationError> {
    let year = validate::parse_year(record.year.as_deref().unwrap_or(validate::NOT_AVAILABLE), current_year)?;
    let rating = validate::parse_rating(record.imdb_rating.as_deref().unwrap_or(validate::NOT_AVAILABLE))?;

    Ok(MovieDetails {
        director: validate::director_or_unknown(record.director.as_deref()),
        year,
        rating,
    })
}
