use serde::Deserialize;

/// Response body of an OMDb title lookup (`?t=<title>`).
///
/// Every field except `Response` is optional: a failed lookup only carries
/// `Response: "False"` and `Error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmdbResponse {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Director", default)]
    pub director: Option<String>,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

impl OmdbResponse {
    pub fn is_success(&self) -> bool {
        self.response.eq_ignore_ascii_case("true")
    }
}

/// Validated metadata, ready to be stored with a movie.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub director: String,
    pub year: i32,
    pub rating: f64,
}
