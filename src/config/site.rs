//! Site configuration (marques.yml)

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::data;

/// Longest accepted admin session lifetime (one year)
pub const MAX_SESSION_TTL_MINUTES: u64 = 525_600;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub tagline: String,
    pub description: String,
    pub url: String,
    pub language: String,
    pub timezone: String,
    pub theme: String,
    pub posts_per_page: usize,
    pub date_format: String,

    // Directory
    pub content_dir: String,
    pub media_dir: String,
    pub theme_dir: String,
    pub data_dir: String,

    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub data: data::Config,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Marques".to_string(),
            tagline: "Just another flat-file site".to_string(),
            description: String::new(),
            url: "http://localhost:8080".to_string(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            theme: "default".to_string(),
            posts_per_page: 10,
            date_format: "LL".to_string(),

            content_dir: "content".to_string(),
            media_dir: "media".to_string(),
            theme_dir: "themes".to_string(),
            data_dir: "data".to_string(),

            server: ServerConfig::default(),
            admin: AdminConfig::default(),
            media: MediaConfig::default(),
            data: data::Config::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.posts_per_page == 0 {
            return Err(anyhow!("posts_per_page must be at least 1"));
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(anyhow!("Unknown timezone: {}", self.timezone));
        }
        if self.admin.session_ttl_minutes == 0
            || self.admin.session_ttl_minutes > MAX_SESSION_TTL_MINUTES
        {
            return Err(anyhow!(
                "admin.session_ttl_minutes must be between 1 and {}",
                MAX_SESSION_TTL_MINUTES
            ));
        }
        Ok(())
    }

    /// Parsed timezone, falling back to UTC
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::Tz::UTC)
    }

    /// Serialize to YAML for `init`
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Admin panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub session_ttl_minutes: u64,
    pub cookie_name: String,
    pub secure_cookies: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: 120,
            cookie_name: "marques_session".to_string(),
            secure_cookies: false,
        }
    }
}

/// Media upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_extensions: [
                "jpg", "jpeg", "png", "gif", "webp", "svg", "pdf", "txt", "zip", "mp4", "mp3",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Marques");
        assert_eq!(config.theme, "default");
        assert_eq!(config.posts_per_page, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Site
theme: paper
posts_per_page: 5
timezone: Europe/Paris
server:
  port: 9000
data:
  compaction_interval_secs: 0
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Site");
        assert_eq!(config.theme, "paper");
        assert_eq!(config.posts_per_page, 5);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.data.compaction_interval_secs, 0);
        assert_eq!(config.tz(), chrono_tz::Europe::Paris);
        assert!(config.media.allowed_extensions.contains(&"png".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SiteConfig::default();
        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.posts_per_page = 0;
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.admin.session_ttl_minutes = 1_000_000_000_000_000;
        assert!(config.validate().is_err());
        config.admin.session_ttl_minutes = MAX_SESSION_TTL_MINUTES;
        assert!(config.validate().is_ok());
    }
}
