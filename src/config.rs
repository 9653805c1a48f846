use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SECRET_KEY_ENV: &str = "MOVIWEB_SECRET_KEY";
pub const OMDB_API_KEY_ENV: &str = "OMDB_API_KEY";
pub const DATABASE_ENV: &str = "MOVIWEB_DATABASE";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_staticdir")]
    pub staticdir: String,
    /// Key used to sign flash message cookies.
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub omdb: OmdbConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            database: DatabaseConfig::default(),
            staticdir: default_staticdir(),
            secret_key: None,
            omdb: OmdbConfig::default(),
            debug_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OmdbConfig {
    #[serde(default = "default_omdb_url")]
    pub url: String,
    #[serde(default)]
    pub apikey: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_omdb_timeout")]
    pub timeout: u64,
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            url: default_omdb_url(),
            apikey: None,
            timeout: default_omdb_timeout(),
        }
    }
}

fn default_port() -> String {
    "5000".to_string()
}

fn default_staticdir() -> String {
    "static".to_string()
}

fn default_omdb_url() -> String {
    "http://www.omdbapi.com/".to_string()
}

fn default_omdb_timeout() -> u64 {
    10
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to `null`, which we treat as all defaults.
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load `path` if given, otherwise `default_path` if it exists, otherwise
    /// use built-in defaults. Environment overrides are applied last.
    pub fn load(path: Option<&str>, default_path: &str) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(default_path).exists() => Self::from_file(default_path)?,
            None => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Secrets and the database location may come from the environment.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var(SECRET_KEY_ENV).filter(|v| !v.is_empty()) {
            self.secret_key = Some(key);
        }
        if let Some(key) = var(OMDB_API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.omdb.apikey = Some(key);
        }
        if let Some(filename) = var(DATABASE_ENV).filter(|v| !v.is_empty()) {
            self.database.sqlite = Some(SqliteConfig { filename });
        }
    }

    pub fn get_database_path(&self) -> String {
        match self.database.sqlite {
            Some(ref sqlite) => sqlite.filename.clone(),
            None => "moviweb.db".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
listen:
  address: 127.0.0.1
  port: "8080"
database:
  sqlite:
    filename: /var/lib/moviweb/moviweb.db
omdb:
  apikey: abc123
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen.address.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.listen.port, "8080");
        assert_eq!(config.get_database_path(), "/var/lib/moviweb/moviweb.db");
        assert_eq!(config.omdb.apikey.as_deref(), Some("abc123"));
        assert_eq!(config.omdb.url, "http://www.omdbapi.com/");
        assert_eq!(config.omdb.timeout, 10);
        assert_eq!(config.staticdir, "static");
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.listen.port, "5000");
        assert_eq!(config.staticdir, "static");
        assert_eq!(config.get_database_path(), "moviweb.db");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_yaml("secret_key: from-file\n").unwrap();
        config.apply_env(|name| match name {
            SECRET_KEY_ENV => Some("from-env".to_string()),
            OMDB_API_KEY_ENV => Some("omdb-key".to_string()),
            _ => None,
        });
        assert_eq!(config.secret_key.as_deref(), Some("from-env"));
        assert_eq!(config.omdb.apikey.as_deref(), Some("omdb-key"));
        assert_eq!(config.get_database_path(), "moviweb.db");
    }
}
