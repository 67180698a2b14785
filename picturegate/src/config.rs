//! Configuration management

use picturegate_pictures::{handlers::DEFAULT_MAX_UPLOAD_BYTES, storage::S3Settings};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Externally visible base URL used for `Location` headers
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            public_url: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[default]
    #[serde(rename = "ephemeral")]
    Ephemeral,

    #[serde(rename = "s3")]
    S3(S3Settings),
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

/// Environment source for `PICTUREGATE__*` variables.
///
/// Values arrive as strings. Tagged sections such as `storage` are buffered
/// before deserialization and never coerced, so booleans and numbers are
/// parsed here.
fn environment() -> config::Environment {
    config::Environment::with_prefix("PICTUREGATE")
        .separator("__")
        .try_parsing(true)
}

/// Command line values that take precedence over file and environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Without an explicit path an optional `picturegate.{toml,yaml,json}` in
    /// the working directory is read. Environment variables use the
    /// `PICTUREGATE__SECTION__KEY` form.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: config::Environment) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("picturegate").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if overrides.public_url.is_some() {
            self.server.public_url = overrides.public_url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.server.public_url.is_none());
        assert!(matches!(config.storage, StorageConfig::Ephemeral));
    }

    #[test]
    fn test_parse_s3_storage() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000
            public_url = "https://pictures.example.com"

            [storage]
            type = "s3"
            bucket = "avatars"
            region = "eu-west-1"
            endpoint_url = "http://localhost:4566"
            force_path_style = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://pictures.example.com")
        );
        let StorageConfig::S3(s3) = config.storage else {
            panic!("expected s3 storage");
        };
        assert_eq!(s3.bucket, "avatars");
        assert_eq!(s3.region.as_deref(), Some("eu-west-1"));
        assert_eq!(s3.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(s3.force_path_style);
    }

    #[test]
    fn test_parse_ephemeral_storage() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            type = "ephemeral"
            "#,
        )
        .unwrap();
        assert!(matches!(config.storage, StorageConfig::Ephemeral));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "picturegate-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[server]\nport = 7070\nmax_upload_bytes = 2048\n\n[storage]\ntype = \"s3\"\nbucket = \"pics\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.server.max_upload_bytes, 2048);
        assert!(matches!(config.storage, StorageConfig::S3(ref s3) if s3.bucket == "pics"));
    }

    #[test]
    fn test_load_s3_storage_from_env() {
        let path = std::env::temp_dir().join(format!(
            "picturegate-env-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "").unwrap();

        let vars: config::Map<String, String> = [
            ("PICTUREGATE__STORAGE__TYPE", "s3"),
            ("PICTUREGATE__STORAGE__BUCKET", "pics"),
            ("PICTUREGATE__STORAGE__FORCE_PATH_STYLE", "true"),
            ("PICTUREGATE__SERVER__PORT", "9001"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = Config::load_with_env(Some(&path), environment().source(Some(vars)));
        std::fs::remove_file(&path).ok();
        let config = config.unwrap();

        assert_eq!(config.server.port, 9001);
        let StorageConfig::S3(s3) = config.storage else {
            panic!("expected s3 storage");
        };
        assert_eq!(s3.bucket, "pics");
        assert!(s3.force_path_style);
        assert!(s3.endpoint_url.is_none());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = std::env::temp_dir().join("picturegate-does-not-exist.toml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply(Overrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(3000),
            public_url: None,
        });
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.public_url.is_none());

        config.apply(Overrides {
            public_url: Some("https://example.com".to_string()),
            ..Overrides::default()
        });
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.public_url.as_deref(), Some("https://example.com"));
    }
}
