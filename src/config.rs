//! Runtime configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::generator::docx::DEFAULT_MAX_INFLATED_BYTES;
use crate::generator::RenderFailurePolicy;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub templates_dir: PathBuf,
    pub generated_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub failure_policy: RenderFailurePolicy,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    /// Total size a DOCX template may inflate to while rendering.
    pub max_inflated_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            templates_dir: PathBuf::from("./templates"),
            generated_dir: PathBuf::from("./generated_docs"),
            uploads_dir: PathBuf::from("./uploads"),
            failure_policy: RenderFailurePolicy::Fail,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_inflated_bytes: DEFAULT_MAX_INFLATED_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = parse_var("PORT")?.unwrap_or(defaults.port);
        let templates_dir = env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.templates_dir);
        let generated_dir = env::var("GENERATED_DOCS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.generated_dir);
        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.uploads_dir);
        let failure_policy =
            parse_var("RENDER_FAILURE_POLICY")?.unwrap_or(defaults.failure_policy);
        let allowed_origins = match env::var("ALLOWED_ORIGINS") {
            Ok(raw) => split_origins(&raw),
            Err(_) => defaults.allowed_origins,
        };
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes);
        let max_inflated_bytes =
            parse_var("MAX_INFLATED_BYTES")?.unwrap_or(defaults.max_inflated_bytes);

        Ok(Self {
            host,
            port,
            templates_dir,
            generated_dir,
            uploads_dir,
            failure_policy,
            allowed_origins,
            max_upload_bytes,
            max_inflated_bytes,
        })
    }

    /// Config rooted in a single base directory; used by tests and local runs.
    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            templates_dir: base.join("templates"),
            generated_dir: base.join("generated_docs"),
            uploads_dir: base.join("uploads"),
            ..Self::default()
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_origins_skips_blanks() {
        let origins = split_origins("http://a.test, ,http://b.test,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_with_base_dir_layout() {
        let config = AppConfig::with_base_dir("/srv/policies");
        assert_eq!(config.templates_dir, PathBuf::from("/srv/policies/templates"));
        assert_eq!(config.generated_dir, PathBuf::from("/srv/policies/generated_docs"));
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/policies/uploads"));
        assert_eq!(config.failure_policy, RenderFailurePolicy::Fail);
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_inflated_bytes, DEFAULT_MAX_INFLATED_BYTES);
    }
}
