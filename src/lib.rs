//! marques: a flat-file content management system
//!
//! Pages and posts are markdown files, site data (settings, navigation,
//! users, redirects) lives in append-only JSON-lines tables, and an axum
//! server renders the public site with Tera themes next to an admin panel.

pub mod auth;
pub mod commands;
pub mod config;
pub mod content;
pub mod data;
pub mod media;
pub mod paths;
pub mod server;
pub mod theme;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "marques.yml";

/// A site on disk: its configuration and resolved directories
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Markdown pages and posts
    pub content_dir: PathBuf,
    /// Uploaded files
    pub media_dir: PathBuf,
    /// Installed themes
    pub theme_dir: PathBuf,
    /// Data tables
    pub data_dir: PathBuf,
}

impl Site {
    /// Load the site in `base_dir`, using defaults when `marques.yml` is missing
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        Self {
            content_dir: base_dir.join(&config.content_dir),
            media_dir: base_dir.join(&config.media_dir),
            theme_dir: base_dir.join(&config.theme_dir),
            data_dir: base_dir.join(&config.data_dir),
            config,
            base_dir,
        }
    }

    /// Named roots for guarded file access
    pub fn registry(&self) -> paths::PathRegistry {
        paths::PathRegistry::for_site(
            &self.content_dir,
            &self.media_dir,
            &self.theme_dir,
            &self.data_dir,
        )
    }

    /// Rows seeded into empty tables
    pub fn defaults(&self) -> data::Defaults {
        data::Defaults::from_site(&self.config)
    }

    /// Open the data tables, retrying on failure
    pub fn open_data(&self) -> Result<data::Handler> {
        Ok(data::Handler::open(
            &self.data_dir,
            self.config.data.clone(),
            &self.defaults(),
        )?)
    }
}
