//! Configuration
//!
//! Settings come from the process environment, with a `.env` file loaded
//! first when present.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub debug: bool,
    pub api_prefix: String,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub model_path: PathBuf,
    pub bind_addr: String,
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self {
            app_name: "Rose Symptom Checker".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            debug: true,
            api_prefix: "/api/v1".to_string(),
            secret_key: secret_key.into(),
            access_token_expire_minutes: 30,
            database_url: "sqlite://rose_checker.db".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:8000".to_string()],
            model_path: PathBuf::from("ml/model.json"),
            bind_addr: "0.0.0.0:8000".to_string(),
            log_dir: None,
        }
    }

    /// Load `.env` (if any) and read the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup. `SECRET_KEY` is mandatory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .context("SECRET_KEY must be set")?;
        let mut settings = Self::with_secret(secret);

        if let Some(v) = lookup("APP_NAME") {
            settings.app_name = v;
        }
        if let Some(v) = lookup("APP_VERSION") {
            settings.app_version = v;
        }
        if let Some(v) = lookup("DEBUG") {
            settings.debug = parse_bool("DEBUG", &v)?;
        }
        if let Some(v) = lookup("API_V1_PREFIX") {
            settings.api_prefix = normalize_prefix(&v);
        }
        if let Some(v) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            settings.access_token_expire_minutes = parse_num("ACCESS_TOKEN_EXPIRE_MINUTES", &v)?;
            if settings.access_token_expire_minutes <= 0 {
                bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be positive");
            }
        }
        if let Some(v) = lookup("DATABASE_URL") {
            settings.database_url = v;
        }
        if let Some(v) = lookup("BACKEND_CORS_ORIGINS") {
            settings.cors_origins = parse_list("BACKEND_CORS_ORIGINS", &v)?;
        }
        if let Some(v) = lookup("MODEL_PATH") {
            settings.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("BIND_ADDR") {
            settings.bind_addr = v;
        }
        settings.log_dir = lookup("LOG_DIR").filter(|s| !s.is_empty()).map(PathBuf::from);

        Ok(settings)
    }

    /// Filesystem path of the SQLite database named by `database_url`.
    pub fn database_path(&self) -> Result<PathBuf> {
        sqlite_path(&self.database_url)
    }
}

/// Accepts `sqlite:///abs/or/rel`, `sqlite://rel` or a bare path.
pub fn sqlite_path(url: &str) -> Result<PathBuf> {
    if let Some(rest) = url.strip_prefix("sqlite:") {
        let path = rest.strip_prefix("///").or_else(|| rest.strip_prefix("//")).unwrap_or(rest);
        if path.is_empty() {
            bail!("DATABASE_URL '{}' names no database file", url);
        }
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        bail!("Unsupported DATABASE_URL '{}': only sqlite is available", url);
    }
    Ok(PathBuf::from(url))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} has invalid boolean value '{}'", key, other),
    }
}

fn parse_num<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse::<T>().with_context(|| format!("{} has invalid value '{}'", key, value))
}

/// Comma separated, or a JSON array of strings.
fn parse_list(key: &str, value: &str) -> Result<Vec<String>> {
    let value = value.trim();
    if value.starts_with('[') {
        return serde_json::from_str(value).with_context(|| format!("{} is not a JSON string array", key));
    }
    Ok(value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_need_only_secret() {
        let s = load(&[("SECRET_KEY", "s3cret")]).unwrap();
        assert_eq!(s.app_name, "Rose Symptom Checker");
        assert_eq!(s.api_prefix, "/api/v1");
        assert_eq!(s.access_token_expire_minutes, 30);
        assert_eq!(s.cors_origins.len(), 2);
        assert!(s.debug);
        assert!(s.log_dir.is_none());
    }

    #[test]
    fn test_missing_secret_fails() {
        assert!(load(&[]).is_err());
        assert!(load(&[("SECRET_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides_and_lists() {
        let s = load(&[
            ("SECRET_KEY", "k"),
            ("DEBUG", "false"),
            ("API_V1_PREFIX", "api/v2/"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("BACKEND_CORS_ORIGINS", r#"["https://a.io", "https://b.io"]"#),
        ])
        .unwrap();
        assert!(!s.debug);
        assert_eq!(s.api_prefix, "/api/v2");
        assert_eq!(s.access_token_expire_minutes, 5);
        assert_eq!(s.cors_origins, vec!["https://a.io", "https://b.io"]);

        let s = load(&[("SECRET_KEY", "k"), ("BACKEND_CORS_ORIGINS", "https://a.io, https://b.io,")]).unwrap();
        assert_eq!(s.cors_origins, vec!["https://a.io", "https://b.io"]);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("SECRET_KEY", "k"), ("DEBUG", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("DEBUG"));
        let err = load(&[("SECRET_KEY", "k"), ("ACCESS_TOKEN_EXPIRE_MINUTES", "soon")]).unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_EXPIRE_MINUTES"));
    }

    #[test]
    fn test_sqlite_urls() {
        assert_eq!(sqlite_path("sqlite:///./test.db").unwrap(), PathBuf::from("./test.db"));
        assert_eq!(sqlite_path("sqlite://rose.db").unwrap(), PathBuf::from("rose.db"));
        assert_eq!(sqlite_path("/var/lib/rose.db").unwrap(), PathBuf::from("/var/lib/rose.db"));
        assert!(sqlite_path("postgresql://localhost/rose").is_err());
        assert!(sqlite_path("sqlite://").is_err());
    }
}
